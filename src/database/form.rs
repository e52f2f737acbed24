use std::str::FromStr;

use potion::Error;

use super::error::TypeError;

pub type FormData = Vec<(String, String)>;

/// Query-string parameters, keeping repeated keys (`?tags=a&tags=b`).
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(query: &str) -> Result<Self, Error> {
        let data: FormData = serde_urlencoded::from_str(query)
            .map_err(|_e| TypeError::new("Malformed query string"))?;

        Ok(Self::from_data(data))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'")).into()),
            None => Ok(None),
        }
    }

    /// `1` and `true` switch a filter on, anything else leaves it off.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.get_str(key), Some("1") | Some("true"))
    }
}
