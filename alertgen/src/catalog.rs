//! Catalog sources and the chunked per-cell catalog stream.

use std::path::Path;

use photom::PerBand;
use rusqlite::Connection;
use skymesh::{descendant_range, Equatorial, TrixelId, ARCSEC_PER_RADIAN, CATALOG_LEVEL};
use variability::VarDescriptor;

use crate::error::PipelineError;

/// MJD of the J2000.0 epoch, the catalog's astrometric reference.
pub const J2000_MJD: f64 = 51544.5;

const DAYS_PER_YEAR: f64 = 365.25;

/// One catalog object with its astrometry, photometry, and variability
/// descriptor.
#[derive(Debug, Clone)]
pub struct Source {
    pub unique_id: i64,
    /// Position at J2000.0.
    pub position: Equatorial,
    /// Proper motion in RA, radians/yr, cos(dec) included.
    pub pm_ra: f64,
    /// Proper motion in Dec, radians/yr.
    pub pm_dec: f64,
    pub parallax_rad: f64,
    /// Carried through to output, never used in filtering.
    pub radial_velocity_kms: f64,
    pub quiescent_mags: PerBand<f64>,
    pub descriptor: Option<VarDescriptor>,
    /// Catalog-level mesh cell holding the source.
    pub htmid: TrixelId,
}

impl Source {
    /// Proper-motion-corrected position at `mjd`.
    pub fn position_at(&self, mjd: f64) -> Equatorial {
        let years = (mjd - J2000_MJD) / DAYS_PER_YEAR;
        let dec = self.position.dec + self.pm_dec * years;
        let ra = self.position.ra + self.pm_ra * years / self.position.dec.cos();
        Equatorial::new(ra, dec)
    }
}

/// Chunked, cursor-style access to the catalog rows of one mesh cell.
///
/// `begin_cell` positions the stream; `next_chunk` hands back up to
/// `chunk_size` rows in ascending id order until an empty chunk marks
/// the end. Implementations may hold an open connection per worker.
pub trait CatalogSource {
    fn begin_cell(&mut self, cell: TrixelId) -> Result<(), PipelineError>;

    fn next_chunk(&mut self, chunk_size: usize) -> Result<Vec<Source>, PipelineError>;
}

/// Catalog over a single SQLite table.
///
/// Expected columns: `uniqueId` (integer), `ra`/`decl` (degrees),
/// `pmRA`/`pmDec` (milliarcsec/yr, RA component cos(dec)-corrected),
/// `parallax` (milliarcsec), `radialVelocity` (km/s), `umag` through
/// `ymag`, `varParamStr` (nullable text), `htmid` (level-21 trixel id).
/// Rows stream in `uniqueId` order via keyset pagination, so memory use
/// is bounded by the chunk size.
pub struct SqliteCatalog {
    conn: Connection,
    table: String,
    range: Option<(i64, i64)>,
    last_id: Option<i64>,
}

impl SqliteCatalog {
    pub fn open(path: &Path, table: &str) -> Result<Self, PipelineError> {
        let conn = Connection::open(path)?;
        Ok(SqliteCatalog {
            conn,
            table: table.to_string(),
            range: None,
            last_id: None,
        })
    }
}

/// Milliarcseconds per radian, the catalog's astrometric unit scale.
pub(crate) const MAS_PER_RAD: f64 = ARCSEC_PER_RADIAN * 1000.0;

impl CatalogSource for SqliteCatalog {
    fn begin_cell(&mut self, cell: TrixelId) -> Result<(), PipelineError> {
        let (lo, hi) = descendant_range(cell, CATALOG_LEVEL);
        self.range = Some((lo as i64, hi as i64));
        self.last_id = None;
        Ok(())
    }

    fn next_chunk(&mut self, chunk_size: usize) -> Result<Vec<Source>, PipelineError> {
        let Some((lo, hi)) = self.range else {
            return Ok(Vec::new());
        };
        let after = self.last_id.unwrap_or(i64::MIN);
        let query = format!(
            "SELECT uniqueId, ra, decl, pmRA, pmDec, parallax, radialVelocity, \
             umag, gmag, rmag, imag, zmag, ymag, varParamStr, htmid \
             FROM {} WHERE htmid >= ?1 AND htmid < ?2 AND uniqueId > ?3 \
             ORDER BY uniqueId LIMIT ?4",
            self.table
        );
        let mut statement = self.conn.prepare_cached(&query)?;
        let rows = statement.query_map(
            rusqlite::params![lo, hi, after, chunk_size as i64],
            |row| {
                let mags: [f64; 6] = [
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                    row.get(11)?,
                    row.get(12)?,
                ];
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    mags,
                    row.get::<_, Option<String>>(13)?,
                    row.get::<_, i64>(14)?,
                ))
            },
        )?;

        let mut chunk = Vec::new();
        for row in rows {
            let (id, ra, decl, pm_ra, pm_dec, parallax, rv, mags, descriptor, htmid) = row?;
            let descriptor = match descriptor {
                Some(text) => VarDescriptor::parse(&text)?,
                None => None,
            };
            chunk.push(Source {
                unique_id: id,
                position: Equatorial::from_degrees(ra, decl),
                pm_ra: pm_ra / MAS_PER_RAD,
                pm_dec: pm_dec / MAS_PER_RAD,
                parallax_rad: parallax / MAS_PER_RAD,
                radial_velocity_kms: rv,
                quiescent_mags: PerBand(mags),
                descriptor,
                htmid: htmid as TrixelId,
            });
        }
        if let Some(last) = chunk.last() {
            self.last_id = Some(last.unique_id);
        } else {
            self.range = None;
        }
        Ok(chunk)
    }
}

/// In-memory catalog for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    rows: Vec<Source>,
    pending: Vec<Source>,
}

impl MemoryCatalog {
    pub fn new(mut rows: Vec<Source>) -> Self {
        rows.sort_by_key(|s| s.unique_id);
        MemoryCatalog {
            rows,
            pending: Vec::new(),
        }
    }
}

impl CatalogSource for MemoryCatalog {
    fn begin_cell(&mut self, cell: TrixelId) -> Result<(), PipelineError> {
        let (lo, hi) = descendant_range(cell, CATALOG_LEVEL);
        self.pending = self
            .rows
            .iter()
            .filter(|s| s.htmid >= lo && s.htmid < hi)
            .cloned()
            .collect();
        // Drain front-first to keep id order.
        self.pending.reverse();
        Ok(())
    }

    fn next_chunk(&mut self, chunk_size: usize) -> Result<Vec<Source>, PipelineError> {
        let take = chunk_size.min(self.pending.len());
        let mut chunk = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(source) = self.pending.pop() {
                chunk.push(source);
            }
        }
        Ok(chunk)
    }
}
