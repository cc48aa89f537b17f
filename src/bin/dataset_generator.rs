use std::path::PathBuf;

use checkerboard_calibration::board::{Board, BoardConfig};
use checkerboard_calibration::camera_model::{CameraModel, DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::io::object_to_json;
use checkerboard_calibration::synthetic::{random_poses, render_checkerboard};
use clap::{Parser, Subcommand};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic checkerboard images
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Squares per board column
        #[arg(long, default_value = "7")]
        rows: usize,

        /// Squares per board row
        #[arg(long, default_value = "9")]
        cols: usize,

        /// Number of frames to generate
        #[arg(short, long, default_value = "20")]
        num_frames: usize,

        /// Image width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Focal length in pixels
        #[arg(long, default_value = "600")]
        focal: f64,

        /// Radial distortion k1
        #[arg(long, default_value = "0.0")]
        k1: f64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Commands::Generate {
            output,
            rows,
            cols,
            num_frames,
            width,
            height,
            focal,
            k1,
            seed,
        } => {
            let board_config = BoardConfig::new(rows, cols)?;
            let camera = PinholeCamera::new(
                focal,
                focal,
                (width as f64 - 1.0) * 0.5,
                (height as f64 - 1.0) * 0.5,
                DistortionCoefficients::from_slice(&[k1, 0.0, 0.0, 0.0, 0.0])?,
                width,
                height,
            );
            std::fs::create_dir_all(&output)?;

            let board_points = Board::from_config(&board_config)?.points_3d;
            let distance = focal * cols as f64 / width as f64 * 1.6;
            let margin = 12.0;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut written = 0;
            let mut attempts = 0;
            while written < num_frames {
                attempts += 1;
                if attempts > num_frames * 1000 {
                    return Err("board does not fit the image, try a smaller board".into());
                }
                let pose = random_poses(&mut rng, &board_config, 1, 0.35, (distance * 0.9, distance * 1.3))
                    .remove(0);
                let transform = pose.to_na_isometry3();
                let p3d: Vec<na::Vector3<f64>> = board_points
                    .iter()
                    .map(|p| (transform * na::Point3::new(p.x as f64, p.y as f64, p.z as f64)).coords)
                    .collect();
                let inside = camera.project(&p3d).iter().all(|p| {
                    p.is_some_and(|p| {
                        p.x > margin
                            && p.y > margin
                            && p.x < width as f64 - margin
                            && p.y < height as f64 - margin
                    })
                });
                if !inside {
                    log::debug!("pose rejected, board leaves the image");
                    continue;
                }
                let img = render_checkerboard(&board_config, &camera, &pose, (width, height));
                img.save(output.join(format!("{:06}.png", written)))?;
                written += 1;
            }
            object_to_json(&output.join("board.json"), &board_config)?;
            println!("Generated {} frames in {}", num_frames, output.display());
        }
    }
    Ok(())
}
