use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key used for a performer whose name could not be read.
pub const UNNAMED_KEY: &str = "null";

/// Prefixed to real names that would otherwise read back as [`UNNAMED_KEY`]
/// or as an already escaped name.
const NAME_ESCAPE: char = '\\';

fn encode_name(name: Option<&str>) -> String {
    match name {
        None => UNNAMED_KEY.to_string(),
        Some(name) if name == UNNAMED_KEY || name.starts_with(NAME_ESCAPE) => {
            format!("{}{}", NAME_ESCAPE, name)
        }
        Some(name) => name.to_string(),
    }
}

fn decode_name(key: String) -> Option<String> {
    if key == UNNAMED_KEY {
        None
    } else if let Some(name) = key.strip_prefix(NAME_ESCAPE) {
        Some(name.to_string())
    } else {
        Some(key)
    }
}

/// Details scraped from one performer profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformerInfo {
    #[serde(rename = "Age")]
    pub age: Option<u32>,
    #[serde(rename = "Nationality")]
    pub nationality: Option<String>,
    #[serde(rename = "SRC")]
    pub image: Option<String>,
}

/// Performer bucket a profile is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
    Tx,
    Unknown,
}

impl Gender {
    /// Maps the site's `/sex/<segment>/` vocabulary onto a bucket.
    pub fn from_segment(segment: &str) -> Self {
        match segment.trim().to_ascii_lowercase().as_str() {
            "female" => Gender::Female,
            "male" => Gender::Male,
            "tx" => Gender::Tx,
            _ => Gender::Unknown,
        }
    }
}

/// Performers of one bucket keyed by name. `None` is an unnamed performer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster(BTreeMap<Option<String>, PerformerInfo>);

impl Roster {
    pub fn insert(&mut self, name: Option<String>, info: PerformerInfo) -> Option<PerformerInfo> {
        self.0.insert(name, info)
    }

    pub fn get(&self, name: Option<&str>) -> Option<&PerformerInfo> {
        self.0.get(&name.map(str::to_string))
    }

    pub fn contains(&self, name: Option<&str>) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = Option<&str>> {
        self.0.keys().map(|k| k.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, info) in &self.0 {
            map.serialize_entry(&encode_name(name.as_deref()), info)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = Roster;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of performer name to performer info")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Roster, A::Error> {
                let mut roster = Roster::default();
                while let Some((key, info)) = access.next_entry::<String, PerformerInfo>()? {
                    roster.insert(decode_name(key), info);
                }
                Ok(roster)
            }
        }

        deserializer.deserialize_map(RosterVisitor)
    }
}

/// Trailer URLs keyed by quality label, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailers(Vec<(String, String)>);

impl Trailers {
    /// Adds or replaces `size`. A replaced entry keeps its position.
    pub fn insert(&mut self, size: String, src: String) {
        match self.0.iter_mut().find(|(label, _)| *label == size) {
            Some(entry) => entry.1 = src,
            None => self.0.push((size, src)),
        }
    }

    pub fn get(&self, size: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(label, _)| label == size)
            .map(|(_, src)| src.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Trailers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, src) in &self.0 {
            map.serialize_entry(label, src)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Trailers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrailersVisitor;

        impl<'de> Visitor<'de> for TrailersVisitor {
            type Value = Trailers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of quality label to trailer URL")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Trailers, A::Error> {
                let mut trailers = Trailers::default();
                while let Some((label, src)) = access.next_entry::<String, String>()? {
                    trailers.insert(label, src);
                }
                Ok(trailers)
            }
        }

        deserializer.deserialize_map(TrailersVisitor)
    }
}

/// The four performer buckets of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformerBuckets {
    #[serde(rename = "FemaleModels")]
    pub female: Roster,
    #[serde(rename = "MaleModels")]
    pub male: Roster,
    #[serde(rename = "TxModels")]
    pub tx: Roster,
    #[serde(rename = "UnknownModels")]
    pub unknown: Roster,
}

impl PerformerBuckets {
    pub fn bucket(&self, gender: Gender) -> &Roster {
        match gender {
            Gender::Female => &self.female,
            Gender::Male => &self.male,
            Gender::Tx => &self.tx,
            Gender::Unknown => &self.unknown,
        }
    }

    fn bucket_mut(&mut self, gender: Gender) -> &mut Roster {
        match gender {
            Gender::Female => &mut self.female,
            Gender::Male => &mut self.male,
            Gender::Tx => &mut self.tx,
            Gender::Unknown => &mut self.unknown,
        }
    }

    pub fn insert(&mut self, gender: Gender, name: Option<String>, info: PerformerInfo) {
        self.bucket_mut(gender).insert(name, info);
    }

    /// Which bucket holds `name`, if any.
    pub fn gender_of(&self, name: Option<&str>) -> Option<Gender> {
        [Gender::Female, Gender::Male, Gender::Tx, Gender::Unknown]
            .into_iter()
            .find(|g| self.bucket(*g).contains(name))
    }

    pub fn len(&self) -> usize {
        self.female.len() + self.male.len() + self.tx.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Metadata assembled for one catalog page. Built once through
/// [`RecordBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogRecord {
    title: String,
    date: Option<String>,
    runtime: Option<String>,
    studio: Option<String>,
    code: Option<String>,
    poster: Option<String>,
    trailers: Option<Trailers>,
    tags: Option<Vec<String>>,
    #[serde(flatten)]
    performers: PerformerBuckets,
}

impl CatalogRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    pub fn studio(&self) -> Option<&str> {
        self.studio.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn poster(&self) -> Option<&str> {
        self.poster.as_deref()
    }

    pub fn trailers(&self) -> Option<&Trailers> {
        self.trailers.as_ref()
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    pub fn performers(&self) -> &PerformerBuckets {
        &self.performers
    }

    /// Older export layout: each bucket is a list of single-entry objects
    /// (`[{"Name": {...}}]`) instead of one name-keyed object.
    pub fn to_legacy_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            for key in ["FemaleModels", "MaleModels", "TxModels", "UnknownModels"] {
                let Some(slot) = fields.get_mut(key) else {
                    continue;
                };
                if let Value::Object(bucket) = slot.take() {
                    let entries = bucket
                        .into_iter()
                        .map(|(name, info)| {
                            let mut entry = Map::new();
                            entry.insert(name, info);
                            Value::Object(entry)
                        })
                        .collect();
                    *slot = Value::Array(entries);
                }
            }
        }
        Ok(value)
    }
}

/// Collects primary-page fields before the performer buckets are known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBuilder {
    title: String,
    date: Option<String>,
    runtime: Option<String>,
    studio: Option<String>,
    code: Option<String>,
    poster: Option<String>,
    trailers: Option<Trailers>,
    tags: Option<Vec<String>>,
}

impl RecordBuilder {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub fn date(mut self, date: Option<String>) -> Self {
        self.date = date;
        self
    }

    pub fn runtime(mut self, runtime: Option<String>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn poster(mut self, poster: Option<String>) -> Self {
        self.poster = poster;
        self
    }

    pub fn trailers(mut self, trailers: Option<Trailers>) -> Self {
        self.trailers = trailers;
        self
    }

    pub fn studio(mut self, studio: Option<String>) -> Self {
        self.studio = studio;
        self
    }

    pub fn tags(mut self, tags: Option<Vec<String>>) -> Self {
        self.tags = tags;
        self
    }

    /// Freezes the record. No further validation or defaulting happens here.
    pub fn build(self, performers: PerformerBuckets) -> CatalogRecord {
        CatalogRecord {
            title: self.title,
            date: self.date,
            runtime: self.runtime,
            studio: self.studio,
            code: self.code,
            poster: self.poster,
            trailers: self.trailers,
            tags: self.tags,
            performers,
        }
    }
}
