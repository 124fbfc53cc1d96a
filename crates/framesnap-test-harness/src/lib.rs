pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod synthetic;
