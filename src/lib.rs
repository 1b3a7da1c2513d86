#![deny(dead_code)]
#![deny(unused_imports)]

pub mod basis;
pub mod evaluate;
pub mod faer_ndarray;
pub mod fit;
pub mod parameterize;
pub mod refine;
pub mod uniform_cubic;

pub use basis::{
    BasisError, BasisScratch, KnotPlacement, basis_funs, basis_funs_into, clustered_knots,
    find_span, num_control_points, uniform_knots, validate_knots,
};
pub use evaluate::{curve_point, eval_curve, eval_surface, surface_point};
pub use fit::{CurveFit, CurveFitXY, FitError, SurfaceFit, fit_curve, fit_curve_xy, fit_surface};
pub use parameterize::{ParameterizeError, chord_lengths, coordinate_map};
pub use refine::{RefineOptions, RefineProgress, SmoothFit, smooth_fit};
