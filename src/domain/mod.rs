// Domain layer: entities, value objects and pure rules over them
pub mod hierarchy;
pub mod navigation;
pub mod permission;
pub mod role;
pub mod user;
