mod profile;
mod summary;

pub use profile::{
    extract_roi_x_profile, extract_roi_y_profile, extract_x_profile, extract_y_profile,
    roi_view,
};
pub use summary::{compute_statistics, Statistics, StatsSummary, HISTOGRAM_BINS, HISTOGRAM_RANGE};
