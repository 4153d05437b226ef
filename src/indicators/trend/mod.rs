pub mod adx;
pub mod linear_regression;

pub use adx::{calculate_directional, Adx, DirectionalSeries};
pub use linear_regression::LinearRegression;
