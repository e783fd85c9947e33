use crate::{Compound, NbtError, Result, Tag};

/// What to do with compound entries a decoder has no field for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tolerance {
    /// Skip entries nobody asked for.
    #[default]
    Ignore,
    /// Fail with `NbtError::UnknownField` on the first unexpected entry.
    Reject,
}

/// Pulls typed fields out of a decoded compound, consuming the entries as it goes.
///
/// ```
/// use quarry_nbt::{Compound, CompoundReader, Tag, Tolerance};
///
/// let mut entries = Compound::new();
/// entries.insert("xPos".to_owned(), Tag::Int(5));
/// let mut reader = CompoundReader::new("Level", Tag::Compound(entries), Tolerance::Reject).unwrap();
/// reader.expect_only(&["xPos"]).unwrap();
/// assert_eq!(reader.take_int("xPos").unwrap(), 5);
/// ```
#[derive(Debug)]
pub struct CompoundReader {
    path: String,
    entries: Compound,
    tolerance: Tolerance,
}

impl CompoundReader {
    /// `path` names the compound in error messages.
    pub fn new(path: &str, tag: Tag, tolerance: Tolerance) -> Result<Self> {
        match tag {
            Tag::Compound(entries) => Ok(CompoundReader {
                path: path.to_owned(),
                entries,
                tolerance,
            }),
            other => Err(NbtError::WrongType {
                field: path.to_owned(),
                expected: "compound",
                found: other.type_name(),
            }),
        }
    }

    /// Checks the entry names against `known` according to the tolerance policy.
    pub fn expect_only(&self, known: &[&str]) -> Result<()> {
        if self.tolerance == Tolerance::Ignore {
            return Ok(());
        }
        let mut unknown: Vec<&String> = self
            .entries
            .keys()
            .filter(|name| !known.contains(&name.as_str()))
            .collect();
        unknown.sort();
        match unknown.first() {
            Some(name) => Err(NbtError::UnknownField(self.field_path(name))),
            None => Ok(()),
        }
    }

    pub fn take(&mut self, name: &str) -> Result<Tag> {
        self.entries
            .shift_remove(name)
            .ok_or_else(|| NbtError::MissingField(self.field_path(name)))
    }

    pub fn take_optional(&mut self, name: &str) -> Option<Tag> {
        self.entries.shift_remove(name)
    }

    pub fn take_byte(&mut self, name: &str) -> Result<i8> {
        match self.take(name)? {
            Tag::Byte(v) => Ok(v),
            other => Err(self.wrong_type(name, "byte", &other)),
        }
    }

    pub fn take_int(&mut self, name: &str) -> Result<i32> {
        match self.take(name)? {
            Tag::Int(v) => Ok(v),
            other => Err(self.wrong_type(name, "int", &other)),
        }
    }

    pub fn take_byte_array(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.take(name)? {
            Tag::ByteArray(v) => Ok(v),
            other => Err(self.wrong_type(name, "byte array", &other)),
        }
    }

    pub fn take_int_array(&mut self, name: &str) -> Result<Vec<i32>> {
        match self.take(name)? {
            Tag::IntArray(v) => Ok(v),
            other => Err(self.wrong_type(name, "int array", &other)),
        }
    }

    pub fn take_list(&mut self, name: &str) -> Result<Vec<Tag>> {
        match self.take(name)? {
            Tag::List(v) => Ok(v),
            other => Err(self.wrong_type(name, "list", &other)),
        }
    }

    /// Like `take_list`, but an absent entry reads as an empty list.
    pub fn take_list_or_empty(&mut self, name: &str) -> Result<Vec<Tag>> {
        match self.take_optional(name) {
            None => Ok(Vec::new()),
            Some(Tag::List(v)) => Ok(v),
            Some(other) => Err(self.wrong_type(name, "list", &other)),
        }
    }

    /// Opens a nested compound with the same tolerance.
    pub fn take_compound(&mut self, name: &str) -> Result<CompoundReader> {
        let tag = self.take(name)?;
        CompoundReader::new(&self.field_path(name), tag, self.tolerance)
    }

    fn field_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn wrong_type(&self, name: &str, expected: &'static str, found: &Tag) -> NbtError {
        NbtError::WrongType {
            field: self.field_path(name),
            expected,
            found: found.type_name(),
        }
    }
}
