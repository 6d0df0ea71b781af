//! Raw classifier code to canonical class id translation.
//!
//! The classifier emits sparse raw codes; display and aggregation use the
//! compact `1..=K` canonical numbering of the legend. Raw codes the map
//! does not define become the [`UNMAPPED_CLASS`] sentinel - they are never
//! passed through raw and never crash the pipeline - and [`NODATA`] is
//! always preserved.

use crate::types::{
    check_window, CategoricalSurface, ClassBlock, ClassCode, GridGeometry, LandError, LandResult,
    PixelWindow, NODATA, UNMAPPED_CLASS,
};

/// Raw code pairs of the standard land-cover classifier, in legend order
const STANDARD_RAW_CODES: [ClassCode; 9] = [1, 2, 4, 5, 7, 8, 9, 10, 11];

/// Total lookup table from raw classifier codes to canonical class ids
#[derive(Debug, Clone)]
pub struct CodeMap {
    table: [ClassCode; 256],
}

impl CodeMap {
    /// Build a map from `(raw, canonical)` pairs.
    ///
    /// Raw codes must be unique and neither side may collide with the
    /// reserved [`NODATA`] and [`UNMAPPED_CLASS`] values.
    pub fn new(pairs: &[(ClassCode, ClassCode)]) -> LandResult<Self> {
        let mut table = [UNMAPPED_CLASS; 256];
        let mut seen = [false; 256];
        table[NODATA as usize] = NODATA;

        for &(raw, canonical) in pairs {
            if raw == NODATA || canonical == NODATA {
                return Err(LandError::InvalidCodeMap(format!(
                    "code {} is reserved for nodata",
                    NODATA
                )));
            }
            if canonical == UNMAPPED_CLASS {
                return Err(LandError::InvalidCodeMap(format!(
                    "canonical id {} is reserved for unmapped codes",
                    UNMAPPED_CLASS
                )));
            }
            if seen[raw as usize] {
                return Err(LandError::InvalidCodeMap(format!("raw code {} mapped twice", raw)));
            }
            seen[raw as usize] = true;
            table[raw as usize] = canonical;
        }

        Ok(Self { table })
    }

    /// The standard map of the land-cover time series:
    /// raw `[1, 2, 4, 5, 7, 8, 9, 10, 11]` to canonical `1..=9`
    pub fn standard() -> Self {
        let mut table = [UNMAPPED_CLASS; 256];
        table[NODATA as usize] = NODATA;
        for (idx, &raw) in STANDARD_RAW_CODES.iter().enumerate() {
            table[raw as usize] = (idx + 1) as ClassCode;
        }
        Self { table }
    }

    /// Identity map over canonical ids `1..=k`. Re-applying it to already
    /// remapped data leaves every pixel unchanged.
    pub fn identity_extended(k: usize) -> Self {
        let mut table = [UNMAPPED_CLASS; 256];
        table[NODATA as usize] = NODATA;
        for id in 1..=k.min(254) {
            table[id] = id as ClassCode;
        }
        Self { table }
    }

    /// Translate one pixel value
    #[inline]
    pub fn remap(&self, code: ClassCode) -> ClassCode {
        self.table[code as usize]
    }

    /// Translate a block in place
    pub fn remap_block(&self, block: &mut ClassBlock) {
        block.mapv_inplace(|code| self.remap(code));
    }
}

/// Lazily remapped view over another categorical surface
#[derive(Debug, Clone)]
pub struct RemappedSurface<S> {
    inner: S,
    map: CodeMap,
}

impl<S: CategoricalSurface> RemappedSurface<S> {
    pub fn new(inner: S, map: CodeMap) -> Self {
        Self { inner, map }
    }
}

impl<S: CategoricalSurface> CategoricalSurface for RemappedSurface<S> {
    fn geometry(&self) -> &GridGeometry {
        self.inner.geometry()
    }

    fn read_block(&self, window: &PixelWindow) -> LandResult<ClassBlock> {
        check_window(self.inner.geometry(), window)?;
        let mut block = self.inner.read_block(window)?;
        self.map.remap_block(&mut block);
        Ok(block)
    }
}
