//! Domain layer: repositories, remotes and the authentication knowledge kept about them

pub mod entities;
pub mod value_objects;
