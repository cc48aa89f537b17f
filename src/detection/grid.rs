//! Assembles corner candidates into the interior-corner lattice of a checkerboard.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;

type Cell = (i32, i32);

const DIRECTIONS: [Cell; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const NEIGHBOUR_COUNT: usize = 8;

/// Returns `w * h` points ordered row by row, or `None` when no seed grows
/// into a complete `w x h` lattice.
pub fn assemble_grid(
    points: &[Vec2],
    pattern_size: (usize, usize),
    tolerance: f32,
    max_seeds: usize,
) -> Option<Vec<Vec2>> {
    let (w, h) = pattern_size;
    if w == 0 || h == 0 || points.len() < w * h {
        return None;
    }
    for seed in seed_order(points, w * h, max_seeds) {
        let Some(lattice) = grow_lattice(points, seed, tolerance) else {
            continue;
        };
        log::trace!("seed {} grew {} cells", seed, lattice.len());
        if let Some(rows) = extract_window(&lattice, points, w, h) {
            return Some(canonicalize(rows, w, h));
        }
    }
    None
}

/// Candidates closest to the centroid of the strongest responses come first.
fn seed_order(points: &[Vec2], expected: usize, max_seeds: usize) -> Vec<usize> {
    let strongest = expected.min(points.len());
    let centroid = points[..strongest].iter().copied().sum::<Vec2>() / strongest as f32;
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .distance_squared(centroid)
            .total_cmp(&points[b].distance_squared(centroid))
    });
    order.truncate(max_seeds.max(1));
    order
}

fn nearest_neighbours(points: &[Vec2], idx: usize, count: usize) -> Vec<usize> {
    let mut others: Vec<usize> = (0..points.len()).filter(|&i| i != idx).collect();
    others.sort_by(|&a, &b| {
        points[a]
            .distance_squared(points[idx])
            .total_cmp(&points[b].distance_squared(points[idx]))
    });
    others.truncate(count);
    others
}

fn grow_lattice(points: &[Vec2], seed: usize, tolerance: f32) -> Option<HashMap<Cell, usize>> {
    let neighbours = nearest_neighbours(points, seed, NEIGHBOUR_COUNT);
    let &first = neighbours.first()?;
    let u = points[first] - points[seed];
    let u_len = u.length();
    if u_len < 1.0 {
        return None;
    }
    let second = neighbours.iter().copied().find(|&i| {
        let d = points[i] - points[seed];
        let len = d.length();
        let cos = (d.dot(u) / (len * u_len)).abs();
        cos < 0.5 && len > 0.5 * u_len && len < 2.0 * u_len
    })?;
    let v = points[second] - points[seed];

    let mut cells: HashMap<Cell, usize> = HashMap::new();
    let mut used = vec![false; points.len()];
    let mut queue = VecDeque::new();
    for (cell, idx) in [((0, 0), seed), ((1, 0), first), ((0, 1), second)] {
        cells.insert(cell, idx);
        used[idx] = true;
        queue.push_back(cell);
    }

    while let Some(cell) = queue.pop_front() {
        let origin = points[cells[&cell]];
        for dir in DIRECTIONS {
            let target = (cell.0 + dir.0, cell.1 + dir.1);
            if cells.contains_key(&target) {
                continue;
            }
            let step = local_step(&cells, points, cell, dir, u, v);
            let predicted = origin + step;
            let radius = tolerance * step.length();
            if let Some(idx) = closest_unused(points, &used, predicted, radius) {
                cells.insert(target, idx);
                used[idx] = true;
                queue.push_back(target);
            }
        }
    }
    Some(cells)
}

/// Lattice step from `cell` towards `dir`, taken from the nearest already
/// assigned pair along the same axis.
fn local_step(
    cells: &HashMap<Cell, usize>,
    points: &[Vec2],
    cell: Cell,
    dir: Cell,
    u: Vec2,
    v: Vec2,
) -> Vec2 {
    let at = |c: Cell| cells.get(&c).map(|&i| points[i]);
    let offset = |c: Cell, d: Cell, s: i32| (c.0 + s * d.0, c.1 + s * d.1);

    if let (Some(p), Some(q)) = (at(cell), at(offset(cell, dir, -1))) {
        return p - q;
    }
    let sides = if dir.0 != 0 {
        [(0, 1), (0, -1)]
    } else {
        [(1, 0), (-1, 0)]
    };
    for side in sides {
        let n = offset(cell, side, 1);
        if let (Some(a), Some(b)) = (at(n), at(offset(n, dir, 1))) {
            return b - a;
        }
        if let (Some(a), Some(b)) = (at(n), at(offset(n, dir, -1))) {
            return a - b;
        }
    }
    let axis = if dir.0 != 0 { u } else { v };
    axis * (dir.0 + dir.1) as f32
}

fn closest_unused(points: &[Vec2], used: &[bool], target: Vec2, radius: f32) -> Option<usize> {
    let radius_sq = radius * radius;
    points
        .iter()
        .enumerate()
        .filter(|(i, p)| !used[*i] && p.distance_squared(target) <= radius_sq)
        .min_by(|(_, a), (_, b)| {
            a.distance_squared(target)
                .total_cmp(&b.distance_squared(target))
        })
        .map(|(i, _)| i)
}

/// Finds the single completely filled `w x h` (or `h x w`) window of the
/// lattice and returns it as rows along the lattice's second axis.
fn extract_window(
    cells: &HashMap<Cell, usize>,
    points: &[Vec2],
    w: usize,
    h: usize,
) -> Option<Vec<Vec<Vec2>>> {
    let min_i = cells.keys().map(|c| c.0).min()?;
    let max_i = cells.keys().map(|c| c.0).max()?;
    let min_j = cells.keys().map(|c| c.1).min()?;
    let max_j = cells.keys().map(|c| c.1).max()?;

    let mut shapes = vec![(w as i32, h as i32)];
    if w != h {
        shapes.push((h as i32, w as i32));
    }
    let mut windows = Vec::new();
    for (ww, wh) in shapes {
        for j0 in min_j..=max_j - wh + 1 {
            for i0 in min_i..=max_i - ww + 1 {
                let filled = (j0..j0 + wh)
                    .all(|j| (i0..i0 + ww).all(|i| cells.contains_key(&(i, j))));
                if filled {
                    windows.push((i0, j0, ww, wh));
                }
            }
        }
    }
    if windows.len() != 1 {
        log::trace!("{} candidate windows in lattice", windows.len());
        return None;
    }
    let (i0, j0, ww, wh) = windows[0];
    Some(
        (j0..j0 + wh)
            .map(|j| (i0..i0 + ww).map(|i| points[cells[&(i, j)]]).collect())
            .collect(),
    )
}

fn transpose(rows: Vec<Vec<Vec2>>) -> Vec<Vec<Vec2>> {
    let cols = rows.first().map_or(0, |r| r.len());
    (0..cols)
        .map(|c| rows.iter().map(|row| row[c]).collect())
        .collect()
}

/// Rows run along the `w` axis (the axis closest to image `+x` when square)
/// and the first corner is the one with the smallest `x + y`.
fn canonicalize(rows: Vec<Vec<Vec2>>, w: usize, h: usize) -> Vec<Vec2> {
    let row_len = rows[0].len();
    let col_len = rows.len();
    let mut grid = if w != h {
        if row_len == w { rows } else { transpose(rows) }
    } else {
        let along_row = (rows[0][row_len - 1] - rows[0][0]).normalize_or_zero();
        let along_col = (rows[col_len - 1][0] - rows[0][0]).normalize_or_zero();
        if along_row.x.abs() >= along_col.x.abs() {
            rows
        } else {
            transpose(rows)
        }
    };

    let corners = [
        (grid[0][0], false, false),
        (grid[0][w - 1], true, false),
        (grid[h - 1][0], false, true),
        (grid[h - 1][w - 1], true, true),
    ];
    let (_, flip_cols, flip_rows) = corners
        .iter()
        .copied()
        .min_by(|a, b| (a.0.x + a.0.y).total_cmp(&(b.0.x + b.0.y)))
        .unwrap_or(corners[0]);
    if flip_rows {
        grid.reverse();
    }
    if flip_cols {
        grid.iter_mut().for_each(|row| row.reverse());
    }
    grid.into_iter().flatten().collect()
}
