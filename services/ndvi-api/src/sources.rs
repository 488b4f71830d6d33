//! Static catalog of backend data sources.

use ee_client::{CloudEstimator, PixelMask};

/// Scenes at or above this ROI cloud coverage (percent) are never used.
pub const MAX_CLOUD_COVERAGE: f64 = 20.0;

/// An optical satellite usable for vegetation products.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteSource {
    /// Tag reported in results (`sentinel`, `landsat`).
    pub name: &'static str,
    pub collection: &'static str,
    /// Near-infrared and red bands, in that order.
    pub ndvi_bands: [&'static str; 2],
    /// Red, green, blue.
    pub rgb_bands: [&'static str; 3],
    /// Native pixel size in metres; every reduction over this source's
    /// imagery uses it.
    pub scale: f64,
    qa_band: &'static str,
    kind: QaKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum QaKind {
    /// Scene classification layer: `keep` classes are clear, `cloud`
    /// classes count toward coverage.
    Classification {
        keep: &'static [u8],
        cloud: &'static [u8],
    },
    /// QA bit field: pixels with any `mask_bits` set are dropped,
    /// `cloud_bit` set counts toward coverage.
    BitField {
        mask_bits: &'static [u8],
        cloud_bit: u8,
    },
}

impl SatelliteSource {
    /// Validity mask applied before any product is derived.
    pub fn pixel_mask(&self) -> PixelMask {
        match self.kind {
            QaKind::Classification { keep, .. } => PixelMask::ClassIn {
                band: self.qa_band.to_string(),
                keep: keep.to_vec(),
            },
            QaKind::BitField { mask_bits, .. } => PixelMask::BitsClear {
                band: self.qa_band.to_string(),
                bits: mask_bits.to_vec(),
            },
        }
    }

    /// ROI cloud coverage estimator, evaluated at the native scale.
    pub fn cloud_estimator(&self) -> CloudEstimator {
        match self.kind {
            QaKind::Classification { cloud, .. } => CloudEstimator::ClassFraction {
                band: self.qa_band.to_string(),
                classes: cloud.to_vec(),
                scale: self.scale,
            },
            QaKind::BitField { cloud_bit, .. } => CloudEstimator::BitFraction {
                band: self.qa_band.to_string(),
                bit: cloud_bit,
                scale: self.scale,
            },
        }
    }
}

/// Sentinel-2 surface reflectance.
///
/// SCL classes kept: 1 saturated/defective, 4 vegetation, 5 bare soil,
/// 6 water. Cloud classes: 3 shadow, 8 medium and 9 high probability.
pub const SENTINEL: SatelliteSource = SatelliteSource {
    name: "sentinel",
    collection: "COPERNICUS/S2_SR_HARMONIZED",
    ndvi_bands: ["B8", "B4"],
    rgb_bands: ["B4", "B3", "B2"],
    scale: 10.0,
    qa_band: "SCL",
    kind: QaKind::Classification {
        keep: &[1, 4, 5, 6],
        cloud: &[3, 8, 9],
    },
};

/// Landsat 9 collection 2 level 2.
///
/// QA_PIXEL bit 3 is cloud shadow, bit 5 is cloud.
pub const LANDSAT: SatelliteSource = SatelliteSource {
    name: "landsat",
    collection: "LANDSAT/LC09/C02/T1_L2",
    ndvi_bands: ["SR_B5", "SR_B4"],
    rgb_bands: ["SR_B4", "SR_B3", "SR_B2"],
    scale: 30.0,
    qa_band: "QA_PIXEL",
    kind: QaKind::BitField {
        mask_bits: &[3, 5],
        cloud_bit: 5,
    },
};

/// Sources in the order they are tried.
pub const SATELLITE_FALLBACK_ORDER: [SatelliteSource; 2] = [SENTINEL, LANDSAT];

/// A gridded climate dataset sampled at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSource {
    pub collection: &'static str,
    pub band: &'static str,
    /// Native pixel size in metres.
    pub scale: f64,
}

/// CHIRPS daily precipitation (mm/day).
pub const CHIRPS: ClimateSource = ClimateSource {
    collection: "UCSB-CHG/CHIRPS/DAILY",
    band: "precipitation",
    scale: 5566.0,
};

/// ERA5-Land hourly 2 m temperature (Kelvin).
pub const ERA5_LAND: ClimateSource = ClimateSource {
    collection: "ECMWF/ERA5_LAND/HOURLY",
    band: "temperature_2m",
    scale: 11132.0,
};
