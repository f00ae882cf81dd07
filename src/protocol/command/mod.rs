mod column_definition;

pub use column_definition::ColumnDefinition;
pub use column_definition::ColumnDefinitionBytes;
pub use column_definition::ColumnDefinitionTail;
