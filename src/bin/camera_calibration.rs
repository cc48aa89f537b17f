use std::path::{Path, PathBuf};
use std::time::Instant;

use checkerboard_calibration::board::BoardConfig;
use checkerboard_calibration::camera_model::{DistortionCoefficients, PinholeCamera};
use checkerboard_calibration::data_loader::{DirectoryOptions, calibrate_directory};
use checkerboard_calibration::detected_points::FrameFeature;
use checkerboard_calibration::io::{object_from_json, object_to_json, write_report};
use checkerboard_calibration::undistort::{get_optimal_new_camera_matrix, undistort_image};
use checkerboard_calibration::util::{error_statistics, reprojection_errors};
use checkerboard_calibration::visualization::draw_corners;
use clap::{Parser, Subcommand};
use image::ImageReader;

#[derive(Parser)]
#[command(version, about, author)]
struct CbCalibCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate from a folder of checkerboard images
    Calibrate {
        /// path to image folder
        path: PathBuf,

        /// squares per board column
        #[arg(long, default_value = "3")]
        rows: usize,

        /// squares per board row
        #[arg(long, default_value = "3")]
        cols: usize,

        /// board config json, overrides rows and cols
        #[arg(long)]
        config: Option<PathBuf>,

        /// write detected corners drawn on each image here
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// image to undistort with the result
        #[arg(long, requires = "output")]
        undistort: Option<PathBuf>,

        /// output path of the undistorted image
        #[arg(long)]
        output: Option<PathBuf>,

        /// text report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// calibration result json path
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = CbCalibCli::parse();
    match cli.command {
        Commands::Calibrate {
            path,
            rows,
            cols,
            config,
            debug_dir,
            undistort,
            output,
            report,
            json,
        } => {
            let board_config = match config {
                Some(p) => object_from_json::<BoardConfig>(&p)?,
                None => BoardConfig::new(rows, cols)?,
            };
            let now = Instant::now();
            let calib = calibrate_directory(
                &path,
                board_config.rows,
                board_config.cols,
                &DirectoryOptions::default(),
            )?;
            println!("calibration took {:.6} sec", now.elapsed().as_secs_f64());
            println!("{}", calib.result);

            let img_w_h = (calib.result.image_h_w.1, calib.result.image_h_w.0);
            let camera = PinholeCamera::from_matrix(
                &calib.result.camera_matrix,
                DistortionCoefficients::from_slice(calib.result.dist_coeffs.as_slice())?,
                img_w_h,
            )?;

            let accepted: Vec<&PathBuf> = calib
                .image_paths
                .iter()
                .zip(&calib.detected)
                .filter_map(|(p, &d)| d.then_some(p))
                .collect();

            if let Some(report_path) = report {
                let per_image: Vec<(String, f64, f64)> = accepted
                    .iter()
                    .zip(&calib.correspondences.image_points)
                    .zip(&calib.correspondences.object_points)
                    .zip(&calib.result.extrinsics)
                    .map(|(((p, img), obj), pose)| {
                        let (avg, med) =
                            error_statistics(&reprojection_errors(&camera, pose, obj, img));
                        (p.display().to_string(), avg, med)
                    })
                    .collect();
                write_report(&report_path, &calib.result, &per_image)?;
            }
            if let Some(json_path) = json {
                object_to_json(&json_path, &calib.result)?;
            }
            if let Some(dir) = debug_dir {
                write_debug_images(&dir, &accepted, &calib.correspondences.image_points, img_w_h)?;
            }
            if let (Some(input), Some(output)) = (undistort, output) {
                let img = ImageReader::open(&input)?.decode()?;
                let img = match img {
                    image::DynamicImage::ImageLuma8(_) | image::DynamicImage::ImageRgb8(_) => img,
                    other => image::DynamicImage::ImageRgb8(other.to_rgb8()),
                };
                let (new_k, roi) =
                    get_optimal_new_camera_matrix(&camera, (img.width(), img.height()), 0.0)?;
                undistort_image(&img, &camera, &new_k, &roi)?.save(&output)?;
                println!("undistorted image written to {}", output.display());
            }
        }
    }
    Ok(())
}

fn write_debug_images(
    dir: &Path,
    paths: &[&PathBuf],
    corners: &[Vec<glam::Vec2>],
    img_w_h: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    for (path, corners) in paths.iter().zip(corners) {
        let img = ImageReader::open(path)?.decode()?;
        let frame = FrameFeature {
            img_w_h,
            corners: corners.clone(),
        };
        let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let out = dir.join(name).with_extension("png");
        draw_corners(&img, &frame).save(out)?;
    }
    Ok(())
}
