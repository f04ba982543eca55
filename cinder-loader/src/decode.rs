//! Stored document -> in-memory chunk.

use std::collections::HashMap;

use cinder_anvil::{BlockState, ChunkDocument, GenerationStatus};
use cinder_world::{Biome, Block, CHUNK_SIZE_X, CHUNK_SIZE_Z, Chunk, Compound, LIGHT_BYTES, SECTION_HEIGHT};
use fastnbt::Value;

use crate::Registries;
use crate::diagnostics::{Recovered, Reporter, TileEntityProblem};

/// Tags owned by the region format rather than the block.
pub const RESERVED_TAGS: [&str; 5] = ["id", "x", "y", "z", "keepPacked"];

pub(crate) struct Decoder<'a> {
    pub registries: &'a Registries,
    pub default_biome: &'a Biome,
    pub height: usize,
    pub reporter: Reporter<'a>,
}

impl Decoder<'_> {
    pub fn decode(&self, document: &ChunkDocument) -> Chunk {
        let mut chunk = Chunk::new(document.x(), document.z(), self.height, self.default_biome.clone());
        self.decode_biomes(document, &mut chunk);
        self.decode_blocks(document, &mut chunk);
        self.decode_tile_entities(document, &mut chunk);
        self.decode_light(document, &mut chunk);
        chunk
    }

    fn decode_biomes(&self, document: &ChunkDocument, chunk: &mut Chunk) {
        // Chunks that stopped before biome generation finished keep the default.
        if document.status() <= GenerationStatus::Biomes {
            return;
        }
        let stored = document.biomes();
        if stored.len() < chunk.biomes().len() {
            log::debug!(
                "Chunk ({}, {}) stores {} biome cells, expected {}; padding with {}",
                chunk.x(),
                chunk.z(),
                stored.len(),
                chunk.biomes().len(),
                self.default_biome.name()
            );
        }
        for (cell, id) in chunk.biomes_mut().iter_mut().zip(stored) {
            *cell = self
                .registries
                .biomes
                .resolve(*id)
                .unwrap_or_else(|| self.default_biome.clone());
        }
    }

    fn decode_blocks(&self, document: &ChunkDocument, chunk: &mut Chunk) {
        let mut resolved: HashMap<&BlockState, Option<Block>> = HashMap::new();
        for x in 0..CHUNK_SIZE_X {
            for z in 0..CHUNK_SIZE_Z {
                for y in 0..self.height {
                    let Some(state) = document.block_state(x, y, z) else {
                        continue;
                    };
                    if state.name == BlockState::AIR && state.properties.is_empty() {
                        continue;
                    }
                    let block = resolved.entry(state).or_insert_with(|| {
                        let block = self.registries.blocks.resolve(&state.name)?;
                        Some(if state.properties.is_empty() {
                            block
                        } else {
                            block.with_properties(&state.properties)
                        })
                    });
                    match block {
                        Some(block) => chunk.set_block(x, y, z, block.clone()),
                        None => self.reporter.report(Recovered::UnknownBlock {
                            x,
                            y,
                            z,
                            name: state.name.clone(),
                        }),
                    }
                }
            }
        }
    }

    fn decode_tile_entities(&self, document: &ChunkDocument, chunk: &mut Chunk) {
        for record in document.tile_entities() {
            let Some((id, [x, y, z])) = self.validate(record, chunk) else {
                continue;
            };
            let Some(handler) = self.registries.handlers.resolve(&id) else {
                self.reporter.report(Recovered::UnknownHandler { id, x, y, z });
                continue;
            };

            let mut data = record.clone();
            for tag in RESERVED_TAGS {
                data.remove(tag);
            }
            // A later record for the same position replaces the earlier one.
            let state = chunk.block(x, y, z);
            let mut block = Block::new(state.name().to_string())
                .with_properties(state.properties())
                .with_handler(handler);
            if !data.is_empty() {
                block = block.with_data(data);
            }
            chunk.set_block(x, y, z, block);
        }
    }

    /// Id and chunk-local position of a record, or `None` after reporting
    /// why it cannot be placed.
    fn validate(&self, record: &Compound, chunk: &Chunk) -> Option<(String, [usize; 3])> {
        let Some(Value::String(id)) = record.get("id") else {
            self.reporter.report(Recovered::InvalidTileEntity {
                id: None,
                problem: TileEntityProblem::MissingId,
            });
            return None;
        };

        let mut position = [0i32; 3];
        for (slot, axis) in position.iter_mut().zip(["x", "y", "z"]) {
            match record.get(axis).and_then(as_int) {
                Some(v) => *slot = v,
                None => {
                    self.reporter.report(Recovered::InvalidTileEntity {
                        id: Some(id.clone()),
                        problem: TileEntityProblem::MissingCoordinate(axis),
                    });
                    return None;
                }
            }
        }

        let [x, y, z] = position;
        let local = local_position(x, chunk.x(), CHUNK_SIZE_X)
            .zip(usize::try_from(y).ok())
            .zip(local_position(z, chunk.z(), CHUNK_SIZE_Z))
            .map(|((x, y), z)| [x, y, z])
            .filter(|[x, y, z]| chunk.in_bounds(*x, *y, *z));
        match local {
            Some(local) => Some((id.clone(), local)),
            None => {
                self.reporter.report(Recovered::InvalidTileEntity {
                    id: Some(id.clone()),
                    problem: TileEntityProblem::OutOfBounds { x, y, z },
                });
                None
            }
        }
    }

    fn decode_light(&self, document: &ChunkDocument, chunk: &mut Chunk) {
        for (sy, stored) in document.sections() {
            let Ok(index) = usize::try_from(sy) else {
                continue;
            };
            let Some(section) = chunk.section_mut(index) else {
                log::debug!(
                    "Chunk ({}, {}) has light for section {sy} above the world height {}",
                    document.x(),
                    document.z(),
                    index * SECTION_HEIGHT
                );
                continue;
            };
            if let Some(light) = stored.sky_light().and_then(|l| <&[u8; LIGHT_BYTES]>::try_from(l).ok()) {
                section.set_sky_light(light);
            }
            if let Some(light) = stored.block_light().and_then(|l| <&[u8; LIGHT_BYTES]>::try_from(l).ok()) {
                section.set_block_light(light);
            }
        }
    }
}

/// Coordinates are chunk-local; world coordinates written by other tools
/// are translated when they land inside this chunk.
fn local_position(value: i32, chunk: i32, width: usize) -> Option<usize> {
    let width_i = width as i32;
    if (0..width_i).contains(&value) {
        return Some(value as usize);
    }
    let offset = value.checked_sub(chunk.checked_mul(width_i)?)?;
    (0..width_i).contains(&offset).then_some(offset as usize)
}

fn as_int(value: &Value) -> Option<i32> {
    match value {
        Value::Byte(v) => Some(i32::from(*v)),
        Value::Short(v) => Some(i32::from(*v)),
        Value::Int(v) => Some(*v),
        Value::Long(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_position() {
        assert_eq!(local_position(5, 3, 16), Some(5));
        // World coordinate 53 is local 5 in chunk 3.
        assert_eq!(local_position(53, 3, 16), Some(5));
        assert_eq!(local_position(-11, -1, 16), Some(5));
        assert_eq!(local_position(100, 3, 16), None);
    }

    #[test]
    fn test_as_int_accepts_every_integer_width() {
        assert_eq!(as_int(&Value::Byte(3)), Some(3));
        assert_eq!(as_int(&Value::Short(-4)), Some(-4));
        assert_eq!(as_int(&Value::Long(70)), Some(70));
        assert_eq!(as_int(&Value::Long(i64::MAX)), None);
        assert_eq!(as_int(&Value::String("7".into())), None);
    }
}
