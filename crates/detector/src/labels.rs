use crate::error::DetectorError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Class entity names indexed by the class labels the model emits.
#[derive(Debug, Clone)]
pub struct LabelMap {
    entities: Vec<String>,
}

impl LabelMap {
    /// One entity per line; line `i` names class index `i`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, DetectorError> {
        let mut entities = reader
            .lines()
            .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        while entities.last().is_some_and(|l| l.trim().is_empty()) {
            entities.pop();
        }

        if entities.is_empty() {
            return Err(DetectorError::EmptyLabels);
        }

        Ok(Self { entities })
    }

    pub fn from_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entity(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entities.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
