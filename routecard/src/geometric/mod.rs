pub mod shape;
pub mod subject;
