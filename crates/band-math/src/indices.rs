//! The four index strategies and their shared pixel pipeline.

use std::collections::BTreeMap;

use sentinel_common::{BandRole, Grid, IndexKind, INDEX_NODATA, REFLECTANCE_SCALE};
use tracing::debug;

use crate::error::{CalculationError, Result};

/// Input grids for one tile, keyed by spectral role.
#[derive(Debug, Default, Clone)]
pub struct BandSet<'a> {
    bands: BTreeMap<BandRole, &'a Grid>,
}

impl<'a> BandSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, role: BandRole, grid: &'a Grid) -> Self {
        self.insert(role, grid);
        self
    }

    pub fn insert(&mut self, role: BandRole, grid: &'a Grid) {
        self.bands.insert(role, grid);
    }

    pub fn get(&self, role: BandRole) -> Option<&'a Grid> {
        self.bands.get(&role).copied()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    fn require(&self, index: IndexKind, role: BandRole) -> Result<&'a Grid> {
        self.get(role)
            .ok_or(CalculationError::MissingBand { index, role })
    }
}

/// A spectral index formula.
pub trait IndexCalculator: Send + Sync {
    /// Which index this strategy produces.
    fn kind(&self) -> IndexKind;

    /// Roles read by [`compute`](Self::compute), in formula order.
    fn required_roles(&self) -> &'static [BandRole] {
        self.kind().required_roles()
    }

    /// Compute the index grid. The output has the shape of the inputs.
    fn compute(&self, bands: &BandSet<'_>) -> Result<Grid>;
}

/// Strategy for `kind`.
pub fn calculator_for(kind: IndexKind) -> &'static dyn IndexCalculator {
    match kind {
        IndexKind::Evi => &Evi,
        IndexKind::Ndmi => &Ndmi,
        IndexKind::Ndwi => &Ndwi,
        IndexKind::Ndvi => &Ndvi,
    }
}

/// Apply the no-data policy to one computed value.
///
/// `zero_band` is true when any contributing raw band was exactly zero.
pub fn finalize_pixel(value: f32, domain: (f32, f32), zero_band: bool) -> f32 {
    let (min, max) = domain;
    if zero_band || !value.is_finite() || value < min || value > max {
        INDEX_NODATA
    } else {
        value
    }
}

#[inline]
fn reflectance(dn: f32) -> f32 {
    dn / REFLECTANCE_SCALE
}

/// Shared pixel loop: fetch the bands, check shapes, evaluate `formula` on
/// scaled reflectances for every pixel and apply [`finalize_pixel`].
fn combine<const N: usize>(
    index: IndexKind,
    bands: &BandSet<'_>,
    roles: [BandRole; N],
    formula: impl Fn([f32; N]) -> f32,
) -> Result<Grid> {
    let mut grids: Vec<&Grid> = Vec::with_capacity(N);
    for role in roles {
        grids.push(bands.require(index, role)?);
    }

    let reference = grids[0];
    if reference.is_empty() {
        return Err(CalculationError::EmptyBand(roles[0]));
    }
    for (role, grid) in roles.iter().zip(&grids) {
        if grid.shape() != reference.shape() {
            return Err(CalculationError::ShapeMismatch {
                role: *role,
                expected: reference.shape(),
                actual: grid.shape(),
            });
        }
    }

    let domain = index.valid_domain();
    let mut masked = 0usize;
    let data: Vec<f32> = (0..reference.len())
        .map(|i| {
            let raw: [f32; N] = std::array::from_fn(|k| grids[k].data[i]);
            let zero_band = raw.iter().any(|&v| v == 0.0);
            let value = finalize_pixel(formula(raw.map(reflectance)), domain, zero_band);
            if value == INDEX_NODATA {
                masked += 1;
            }
            value
        })
        .collect();

    debug!(
        index = %index,
        pixels = data.len(),
        nodata = masked,
        "Computed index grid"
    );

    Ok(Grid {
        data,
        width: reference.width,
        height: reference.height,
    })
}

/// Enhanced Vegetation Index.
///
/// `EVI = 2.5 * (NIR - RED) / (NIR + 6 RED - 7.5 BLUE + 1)`, valid in `[-1, 1.25]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evi;

impl IndexCalculator for Evi {
    fn kind(&self) -> IndexKind {
        IndexKind::Evi
    }

    fn compute(&self, bands: &BandSet<'_>) -> Result<Grid> {
        combine(
            IndexKind::Evi,
            bands,
            [BandRole::Nir, BandRole::Red, BandRole::Blue],
            |[nir, red, blue]| 2.5 * ((nir - red) / (nir + 6.0 * red - 7.5 * blue + 1.0)),
        )
    }
}

/// Normalized Difference Moisture Index, `(NIR_NARROW - SWIR) / (NIR_NARROW + SWIR)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ndmi;

impl IndexCalculator for Ndmi {
    fn kind(&self) -> IndexKind {
        IndexKind::Ndmi
    }

    fn compute(&self, bands: &BandSet<'_>) -> Result<Grid> {
        combine(
            IndexKind::Ndmi,
            bands,
            [BandRole::NirNarrow, BandRole::Swir],
            |[nir, swir]| (nir - swir) / (nir + swir),
        )
    }
}

/// Normalized Difference Water Index (McFeeters), `(GREEN - NIR) / (GREEN + NIR)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ndwi;

impl IndexCalculator for Ndwi {
    fn kind(&self) -> IndexKind {
        IndexKind::Ndwi
    }

    fn compute(&self, bands: &BandSet<'_>) -> Result<Grid> {
        combine(
            IndexKind::Ndwi,
            bands,
            [BandRole::Green, BandRole::Nir],
            |[green, nir]| (green - nir) / (green + nir),
        )
    }
}

/// Normalized Difference Vegetation Index, `(NIR - RED) / (NIR + RED)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ndvi;

impl IndexCalculator for Ndvi {
    fn kind(&self) -> IndexKind {
        IndexKind::Ndvi
    }

    fn compute(&self, bands: &BandSet<'_>) -> Result<Grid> {
        combine(
            IndexKind::Ndvi,
            bands,
            [BandRole::Nir, BandRole::Red],
            |[nir, red]| (nir - red) / (nir + red),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: f32) -> Grid {
        Grid::filled(1, 1, value)
    }

    #[test]
    fn test_calculator_for_covers_all_kinds() {
        for kind in IndexKind::ALL {
            let calc = calculator_for(kind);
            assert_eq!(calc.kind(), kind);
            assert_eq!(calc.required_roles(), kind.required_roles());
        }
    }

    #[test]
    fn test_ndvi_reference_pixel() {
        let nir = single(8000.0);
        let red = single(2000.0);
        let bands = BandSet::new()
            .with(BandRole::Nir, &nir)
            .with(BandRole::Red, &red);
        let out = Ndvi.compute(&bands).unwrap();
        assert!((out.data[0] - 0.6).abs() < 1e-6, "got {}", out.data[0]);
    }

    #[test]
    fn test_ndwi_zero_green_is_nodata() {
        let green = single(0.0);
        let nir = single(5000.0);
        let bands = BandSet::new()
            .with(BandRole::Green, &green)
            .with(BandRole::Nir, &nir);
        let out = Ndwi.compute(&bands).unwrap();
        assert_eq!(out.data[0], INDEX_NODATA);
    }

    #[test]
    fn test_finalize_pixel_domain() {
        let evi = IndexKind::Evi.valid_domain();
        assert_eq!(finalize_pixel(1.3, evi, false), INDEX_NODATA);
        assert_eq!(finalize_pixel(1.25, evi, false), 1.25);
        assert_eq!(finalize_pixel(-1.0, evi, false), -1.0);
        assert_eq!(finalize_pixel(-1.01, evi, false), INDEX_NODATA);
        assert_eq!(finalize_pixel(0.5, evi, true), INDEX_NODATA);
        assert_eq!(finalize_pixel(f32::NAN, evi, false), INDEX_NODATA);
        assert_eq!(finalize_pixel(f32::INFINITY, evi, false), INDEX_NODATA);
        assert_eq!(finalize_pixel(f32::NEG_INFINITY, evi, false), INDEX_NODATA);
    }

    #[test]
    fn test_missing_band() {
        let nir = single(1.0);
        let bands = BandSet::new().with(BandRole::Nir, &nir);
        match Ndvi.compute(&bands) {
            Err(CalculationError::MissingBand { index, role }) => {
                assert_eq!(index, IndexKind::Ndvi);
                assert_eq!(role, BandRole::Red);
            }
            other => panic!("expected MissingBand, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let nir = Grid::filled(2, 2, 100.0);
        let red = Grid::filled(2, 1, 100.0);
        let bands = BandSet::new()
            .with(BandRole::Nir, &nir)
            .with(BandRole::Red, &red);
        assert!(matches!(
            Ndvi.compute(&bands),
            Err(CalculationError::ShapeMismatch { role: BandRole::Red, .. })
        ));
    }

    #[test]
    fn test_empty_band() {
        let empty = Grid::filled(0, 0, 0.0);
        let bands = BandSet::new()
            .with(BandRole::Nir, &empty)
            .with(BandRole::Red, &empty);
        assert!(matches!(Ndvi.compute(&bands), Err(CalculationError::EmptyBand(_))));
    }
}
