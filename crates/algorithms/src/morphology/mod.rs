//! Mathematical morphology with disk structuring elements
//!
//! - **Erosion** / **Dilation**: flat minimum / maximum filters
//! - **Geodesic reconstruction** by dilation and by erosion
//! - **Opening / Closing by reconstruction**: remove bright / fill dark
//!   structures smaller than the disk while keeping the contours of the rest

mod closing;
mod dilate;
mod element;
mod erode;
mod flat;
mod opening;
mod reconstruction;

pub use closing::{closing_by_reconstruction, ClosingByReconstruction, ClosingParams};
pub use dilate::{dilate, Dilate, DilateParams};
pub use element::StructuringElement;
pub use erode::{erode, Erode, ErodeParams};
pub use opening::{opening_by_reconstruction, OpeningByReconstruction, OpeningParams};
pub use reconstruction::{reconstruct_by_dilation, reconstruct_by_erosion};
