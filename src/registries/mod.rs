mod prefix_provider;
mod yaml_table_provider;

pub use prefix_provider::PrefixProvider;
pub use yaml_table_provider::YamlTableProvider;
