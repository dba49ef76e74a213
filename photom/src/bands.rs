//! The six survey passbands and per-band value containers.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A filter name that is not one of the six survey passbands.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown passband {0:?}")]
pub struct UnknownBand(pub String);

/// Survey passband. Array layouts throughout the workspace use this fixed
/// u, g, r, i, z, y order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Band {
    pub const COUNT: usize = 6;
    pub const ALL: [Band; 6] = [Band::U, Band::G, Band::R, Band::I, Band::Z, Band::Y];

    /// Position of this band in the fixed ordering.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::U => "u",
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
            Band::Y => "y",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = UnknownBand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u" => Ok(Band::U),
            "g" => Ok(Band::G),
            "r" => Ok(Band::R),
            "i" => Ok(Band::I),
            "z" => Ok(Band::Z),
            "y" => Ok(Band::Y),
            other => Err(UnknownBand(other.to_string())),
        }
    }
}

/// One value per passband, indexable by [`Band`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerBand<T>(pub [T; 6]);

impl<T> PerBand<T> {
    pub fn from_fn(mut f: impl FnMut(Band) -> T) -> Self {
        PerBand(Band::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, &T)> {
        Band::ALL.iter().copied().zip(self.0.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerBand<U> {
        PerBand(Band::ALL.map(|b| f(&self.0[b.index()])))
    }
}

impl<T: Copy> PerBand<T> {
    pub fn splat(value: T) -> Self {
        PerBand([value; 6])
    }
}

impl<T: Default> Default for PerBand<T> {
    fn default() -> Self {
        PerBand(std::array::from_fn(|_| T::default()))
    }
}

impl<T> Index<Band> for PerBand<T> {
    type Output = T;

    fn index(&self, band: Band) -> &T {
        &self.0[band.index()]
    }
}

impl<T> IndexMut<Band> for PerBand<T> {
    fn index_mut(&mut self, band: Band) -> &mut T {
        &mut self.0[band.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_order_is_ugrizy() {
        let names: Vec<&str> = Band::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names, ["u", "g", "r", "i", "z", "y"]);
        assert_eq!(Band::U.index(), 0);
        assert_eq!(Band::Y.index(), 5);
    }

    #[test]
    fn parse_round_trip() {
        for band in Band::ALL {
            assert_eq!(band.name().parse::<Band>().unwrap(), band);
        }
        assert!("q".parse::<Band>().is_err());
        assert!("R".parse::<Band>().is_err());
    }

    #[test]
    fn per_band_indexing() {
        let mut values = PerBand::from_fn(|b| b.index() as f64);
        assert_eq!(values[Band::R], 2.0);
        values[Band::R] = 9.0;
        assert_eq!(values.0, [0.0, 1.0, 9.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn serde_band_is_lowercase() {
        let json = serde_json::to_string(&Band::Z).unwrap();
        assert_eq!(json, "\"z\"");
        let back: Band = serde_json::from_str("\"g\"").unwrap();
        assert_eq!(back, Band::G);
    }
}
