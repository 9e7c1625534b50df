pub mod availability;
pub mod gazetteer;
pub mod geo;
