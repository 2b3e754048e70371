// ABOUTME: Library module for dynamodb-table-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod dynamo;
pub mod interactive;
pub mod migration;
pub mod utils;
