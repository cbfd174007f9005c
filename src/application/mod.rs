// Application layer: commands, queries, their buses and handlers
pub mod command_bus;
pub mod command_handlers;
pub mod commands;
pub mod delayed_task;
pub mod events;
pub mod queries;
pub mod query_bus;
pub mod query_handlers;
pub mod resolver;
pub mod services;
pub mod validators;
