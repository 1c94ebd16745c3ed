use redb::TableDefinition;

/// Animal rows: id -> Animal (msgpack)
pub const ANIMALS: TableDefinition<u64, &[u8]> = TableDefinition::new("animals");

/// Monotonic id counters: sequence name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const ANIMAL_SEQUENCE: &str = "animals";
