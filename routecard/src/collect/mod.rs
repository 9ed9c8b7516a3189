pub mod catalogue;
pub mod controls;
pub mod definition_query;
pub mod global_variables;
pub mod provider;
pub mod selection;
