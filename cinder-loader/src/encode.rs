//! In-memory chunk -> stored document.

use cinder_anvil::{ChunkDocument, GenerationStatus};
use cinder_world::{Block, CHUNK_SIZE_X, CHUNK_SIZE_Z, Chunk, Compound, biome_index};
use fastnbt::Value;

/// Overwrite `document` with the contents of `chunk`.
pub(crate) fn encode(chunk: &Chunk, document: &mut ChunkDocument, data_version: i32) {
    document.set_status(GenerationStatus::Full);
    document.set_data_version(data_version);
    document.set_biomes(vec![0; chunk.biomes().len()]);

    let mut tile_entities = Vec::new();
    for x in 0..CHUNK_SIZE_X {
        for z in 0..CHUNK_SIZE_Z {
            for y in 0..chunk.height() {
                let block = chunk.block(x, y, z);
                document.set_block_state(x, y, z, block.name(), block.properties());

                document.set_biome(biome_index(x, y, z), chunk.biome_at(x, y, z).id());

                if let Some(record) = tile_entity(block, x, y, z) {
                    tile_entities.push(record);
                }
            }
        }
    }
    document.set_tile_entities(tile_entities);

    for (index, section) in chunk.sections().iter().enumerate() {
        // Heights are validated to fit a signed section index.
        let Ok(sy) = i8::try_from(index) else {
            break;
        };
        document.set_light(sy, section.sky_light(), section.block_light());
    }
}

fn tile_entity(block: &Block, x: usize, y: usize, z: usize) -> Option<Compound> {
    let handler = block.handler()?;
    let mut record = block.data().cloned().unwrap_or_default();
    record.insert("id".to_string(), Value::String(handler.namespace_id().to_string()));
    record.insert("x".to_string(), Value::Int(x as i32));
    record.insert("y".to_string(), Value::Int(y as i32));
    record.insert("z".to_string(), Value::Int(z as i32));
    record.insert("keepPacked".to_string(), Value::Byte(0));
    Some(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cinder_world::{Biome, NamedHandler};

    use super::*;

    #[test]
    fn test_status_is_always_full() {
        let chunk = Chunk::new(0, 0, 16, Biome::PLAINS);
        let mut document = ChunkDocument::new(0, 0);
        document.set_status(GenerationStatus::Noise);
        encode(&chunk, &mut document, 2586);
        assert_eq!(document.status(), GenerationStatus::Full);
        assert_eq!(document.data_version(), 2586);
    }

    #[test]
    fn test_biome_cells_use_chunk_layout() {
        let mut chunk = Chunk::new(0, 0, 32, Biome::PLAINS);
        chunk.biomes_mut()[biome_index(12, 20, 4)] = Biome::DESERT;
        let mut document = ChunkDocument::new(0, 0);
        encode(&chunk, &mut document, 2586);

        assert_eq!(document.biomes().len(), chunk.biomes().len());
        // y=20 -> cell row 5, z=4 -> 1, x=12 -> 3
        assert_eq!(document.biomes()[5 << 4 | 1 << 2 | 3], Biome::DESERT.id());
        assert_eq!(document.biomes()[0], Biome::PLAINS.id());
    }

    #[test]
    fn test_handler_block_becomes_tile_entity() {
        let mut data = Compound::new();
        data.insert("count".to_string(), Value::Int(5));
        let chest = Block::new("minecraft:chest")
            .with_property("facing", "north")
            .with_handler(Arc::new(NamedHandler::new("minecraft:chest")))
            .with_data(data);

        let mut chunk = Chunk::new(0, 0, 16, Biome::PLAINS);
        chunk.set_block(3, 7, 9, chest);
        let mut document = ChunkDocument::new(0, 0);
        encode(&chunk, &mut document, 2586);

        let records = document.tile_entities();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.get("id"), Some(&Value::String("minecraft:chest".to_string())));
        assert_eq!(record.get("x"), Some(&Value::Int(3)));
        assert_eq!(record.get("y"), Some(&Value::Int(7)));
        assert_eq!(record.get("z"), Some(&Value::Int(9)));
        assert_eq!(record.get("keepPacked"), Some(&Value::Byte(0)));
        assert_eq!(record.get("count"), Some(&Value::Int(5)));

        let state = document.block_state(3, 7, 9).unwrap();
        assert_eq!(state.name, "minecraft:chest");
        assert_eq!(state.properties.get("facing").map(String::as_str), Some("north"));
    }
}
