pub mod builder_settings;
pub mod cli_args;
pub mod data_directory;
pub mod gas_price_floors;
