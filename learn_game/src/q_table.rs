use crate::board::Position;
use crate::players::Marks;
use chrono::offset::Local;
use itertools::Itertools;
use ndarray::prelude::*;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{prelude::*, BufReader, BufWriter};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// The acting mark together with the board encoding it is acting on.
pub type StateKey = (Marks, i32);

/// One quality estimate per square, occupied squares included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Moves {
    pub moves: Array2<f32>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct QTable {
    #[serde(serialize_with = "serialize_states")]
    #[serde(deserialize_with = "deserialize_states")]
    qtable: HashMap<StateKey, Moves>,
}

impl Deref for Moves {
    type Target = Array2<f32>;
    fn deref(&self) -> &<Self as Deref>::Target {
        &self.moves
    }
}
impl DerefMut for Moves {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.moves
    }
}

impl Deref for QTable {
    type Target = HashMap<StateKey, Moves>;
    fn deref(&self) -> &<Self as Deref>::Target {
        &self.qtable
    }
}

impl DerefMut for QTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.qtable
    }
}

impl Moves {
    pub fn zeroed() -> Moves {
        Moves {
            moves: Array::zeros((3, 3)),
        }
    }
    /// Highest estimate; ties go to the first square in row-major order.
    pub fn select_max_move(&self) -> Position {
        self.indexed_iter()
            .fold(((0, 0), self[[0, 0]]), |best, (position, &value)| {
                if value > best.1 {
                    (position, value)
                } else {
                    best
                }
            })
            .0
    }
    pub fn max_value(&self) -> f32 {
        self.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

impl Default for Moves {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl QTable {
    pub fn new() -> Self {
        QTable {
            qtable: HashMap::with_capacity(11000),
        }
    }
    pub fn entry_or_default(&mut self, state: StateKey) -> &mut Moves {
        self.entry(state).or_insert_with(Moves::zeroed)
    }
    /// Best estimate for `state`, or 0.0 if it was never visited.
    pub fn max_value(&self, state: &StateKey) -> f32 {
        self.get(state).map_or(0.0, Moves::max_value)
    }
}

fn serialize_states<S>(states: &HashMap<StateKey, Moves>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(states.len()))?;
    for ((mark, encoding), moves) in states {
        let key_str = format!("({}, {})", mark.value(), encoding);
        map.serialize_entry(&key_str, moves)?;
    }
    map.end()
}

fn parse_state_key(key: &str) -> Option<StateKey> {
    let (mark, encoding) = key
        .trim_matches(|c| c == '(' || c == ')')
        .split(", ")
        .collect_tuple()?;
    let mark = Marks::from_value(mark.parse().ok()?)?;
    Some((mark, encoding.parse().ok()?))
}

fn deserialize_states<'de, D>(deserializer: D) -> Result<HashMap<StateKey, Moves>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MapVisitor {
        marker: PhantomData<fn() -> HashMap<StateKey, Moves>>,
    }
    impl<'de> Visitor<'de> for MapVisitor {
        type Value = HashMap<StateKey, Moves>;
        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map from \"(mark, encoding)\" to square estimates")
        }
        fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut map = HashMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, Moves>()? {
                let state = parse_state_key(&key)
                    .ok_or_else(|| <M::Error as de::Error>::custom(format!("bad state key {key:?}")))?;
                map.insert(state, value);
            }
            Ok(map)
        }
    }
    deserializer.deserialize_map(MapVisitor {
        marker: PhantomData,
    })
}

/// Writes `qtable-<date>.json` and `qtable-<date>.pickle` into `path`.
pub fn q_table_to_disk(path: &Path, q: &QTable) -> Result<(PathBuf, PathBuf), anyhow::Error> {
    let today = Local::now().date_naive();
    fs::create_dir_all(path)?;
    let q_json: PathBuf = path.join(format!("qtable-{today}.json"));
    let q_pickle: PathBuf = path.join(format!("qtable-{today}.pickle"));
    let mut file_json = BufWriter::new(File::create(&q_json)?);
    serde_json::to_writer(&mut file_json, q)?;
    file_json.flush()?;
    let mut file = BufWriter::new(File::create(&q_pickle)?);
    serde_pickle::to_writer(&mut file, q, serde_pickle::SerOptions::new())?;
    file.flush()?;
    log::info!("{:<32}{}", "saved q table", path.display());
    Ok((q_json, q_pickle))
}

pub fn q_table_from_disk_pickle(file: &Path) -> Result<QTable, anyhow::Error> {
    let mut reader = BufReader::new(File::open(file)?);
    let mut buf: Vec<u8> = vec![];
    reader.read_to_end(&mut buf)?;
    let decoded: QTable = serde_pickle::from_slice(&buf, serde_pickle::DeOptions::new())?;
    Ok(decoded)
}

pub fn q_table_from_disk_json(file: &Path) -> Result<QTable, anyhow::Error> {
    let reader = BufReader::new(File::open(file)?);
    let decoded: QTable = serde_json::from_reader(reader)?;
    Ok(decoded)
}

/// Loads an archived table, picking the format from the file extension.
pub fn q_table_from_disk(file: &Path) -> Result<QTable, anyhow::Error> {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("pickle") => q_table_from_disk_pickle(file),
        _ => q_table_from_disk_json(file),
    }
}
