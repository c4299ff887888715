mod mvg;

pub use mvg::*;
