//! Sample-point generation over the walkable floor area

use rand::seq::index;
use rand::Rng;
use tracing::debug;

use super::geometry::bounds;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::{FloorRaster, Obstacle, Point};

/// Cap on sample points per analysis
pub const MAX_SAMPLE_POINTS: usize = 5000;

/// Lattice over the free pixels of a raster.
///
/// The lattice starts at pixel (0, 0) and steps `max(1, ⌊spacing·ppm⌋)`
/// pixels; points are in pixel coordinates.
pub fn generate_sample_grid<R: Rng + ?Sized>(
    raster: &FloorRaster,
    pixels_per_meter: f64,
    spacing_m: f64,
    max_points: usize,
    rng: &mut R,
) -> AnalysisResult<Vec<Point>> {
    let pixels = raster.width.checked_mul(raster.height).ok_or_else(|| {
        AnalysisError::InvalidInput(format!(
            "raster of {}x{} pixels is too large",
            raster.width, raster.height
        ))
    })?;
    if raster.luminance.len() != pixels {
        return Err(AnalysisError::InvalidInput(format!(
            "raster is {}x{} but has {} pixels",
            raster.width,
            raster.height,
            raster.luminance.len()
        )));
    }
    let step = (spacing_m * pixels_per_meter).floor();
    let step = if step.is_finite() && step >= 1.0 {
        step as usize
    } else {
        1
    };

    let mut points = Vec::new();
    for y in (0..raster.height).step_by(step) {
        for x in (0..raster.width).step_by(step) {
            if raster.is_free(x, y) {
                points.push(Point::new(x as f64, y as f64));
            }
        }
    }
    debug!("Raster lattice: step {}px, {} free points", step, points.len());
    Ok(subsample(points, max_points, rng))
}

/// Lattice of cell centres over the bounding box of the walls, used when
/// no raster is supplied. An empty wall set yields no points.
///
/// Cells are addressed row-major and only the sampled cells are built, so
/// the cost follows `max_points` rather than the extent of the plan.
pub fn generate_bounds_grid<R: Rng + ?Sized>(
    obstacles: &[Obstacle],
    step: f64,
    max_points: usize,
    rng: &mut R,
) -> AnalysisResult<Vec<Point>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "grid spacing must be positive, got {step}"
        )));
    }
    let Some((lo, hi)) = bounds(obstacles) else {
        return Ok(vec![]);
    };

    let cols = ((hi.x - lo.x) / step).floor() as usize;
    let rows = ((hi.y - lo.y) / step).floor() as usize;
    let total = cols.checked_mul(rows).ok_or_else(|| {
        AnalysisError::InvalidInput(format!(
            "bounds lattice of {cols}x{rows} cells at spacing {step} is too large"
        ))
    })?;
    debug!("Bounds lattice: {}x{} cells", cols, rows);

    let cell = |i: usize| {
        Point::new(
            lo.x + ((i % cols) as f64 + 0.5) * step,
            lo.y + ((i / cols) as f64 + 0.5) * step,
        )
    };
    if total <= max_points {
        return Ok((0..total).map(cell).collect());
    }
    let keep = index::sample(rng, total, max_points);
    debug!("Subsampled {} -> {} points", total, keep.len());
    Ok(keep.into_iter().map(cell).collect())
}

/// Uniform sample without replacement. Survivors come back in draw order,
/// so any prefix of the result is itself a uniform sample.
fn subsample<R: Rng + ?Sized>(points: Vec<Point>, max_points: usize, rng: &mut R) -> Vec<Point> {
    if points.len() <= max_points {
        return points;
    }
    let keep = index::sample(rng, points.len(), max_points);
    debug!("Subsampled {} -> {} points", points.len(), keep.len());
    keep.into_iter().map(|i| points[i]).collect()
}
