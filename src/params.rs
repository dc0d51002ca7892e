//! Ordered access to urlencoded form bodies.
//!
//! Key order is observable: partial-update endpoints echo the fields they
//! applied in the order the request supplied them, so pairs are kept in
//! wire order instead of being collected into a map.

use url::form_urlencoded;

pub struct Params(Vec<(String, String)>);

impl Params {
    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn parse(body: &[u8]) -> Self {
        Self(form_urlencoded::parse(body).into_owned().collect())
    }

    /// Returns the first value supplied for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// All pairs in the order they appeared on the wire.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_wire_order() {
        let params = Params::parse(b"b=2&a=1&c=3");
        let keys: Vec<_> = params.pairs().map(|(name, _)| name).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn decodes_percent_escapes_and_plus() {
        let params = Params::parse(b"name=rock+am+Ring&city=K%C3%B6ln");
        assert_eq!(params.get("name"), Some("rock am Ring"));
        assert_eq!(params.get("city"), Some("Köln"));
    }

    #[test]
    fn missing_keys_are_none() {
        let params = Params::parse(b"a=1");
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), None);
    }
}
