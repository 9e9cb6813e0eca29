//! Shared profile types used by both the API server and the client session

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Loosely-typed profile fields as they travel over the wire
pub type ProfileFields = Map<String, Value>;

/// The single persisted entity: one document per identity key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub occupation: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            ..Default::default()
        }
    }

    /// Shallow merge: every key present in `fields` replaces the current value,
    /// keys missing from `fields` keep their current value.
    pub fn merged_with(&self, fields: &ProfileFields) -> Result<Profile, serde_json::Error> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in fields {
            current.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(current))
    }
}

/// Distinguishes "field absent" (outer `None`) from "field set to null" (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Typed partial update. Only the fields listed here can be written through
/// an update; anything else in the body (including `email`) is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    /// Only used for the ownership check, never written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub age: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub occupation: Option<Option<String>>,
}

impl ProfilePatch {
    /// Parse an untyped request body into a patch
    pub fn from_value(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("Request body must be a JSON object".to_string());
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// True when a raw body names an `id` other than `uid`. Any non-string
    /// `id` counts as a different identity.
    pub fn claims_other_identity(body: &Value, uid: &str) -> bool {
        match body.get("id") {
            None => false,
            Some(Value::String(id)) => id != uid,
            Some(_) => true,
        }
    }

    /// True when no updatable field is present (`id` does not count)
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.age.is_none()
            && self.occupation.is_none()
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Names of the updatable fields carried by this patch
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.display_name.is_some() {
            names.push("displayName");
        }
        if self.first_name.is_some() {
            names.push("firstName");
        }
        if self.last_name.is_some() {
            names.push("lastName");
        }
        if self.age.is_some() {
            names.push("age");
        }
        if self.occupation.is_some() {
            names.push("occupation");
        }
        names
    }

    /// The updatable fields as a JSON object, explicit nulls included
    pub fn fields(&self) -> ProfileFields {
        match serde_json::to_value(self.clone().without_id()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Merge-write this patch onto a profile in place
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = &self.display_name {
            profile.display_name = v.clone();
        }
        if let Some(v) = &self.first_name {
            profile.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            profile.last_name = v.clone();
        }
        if let Some(v) = self.age {
            profile.age = v;
        }
        if let Some(v) = &self.occupation {
            profile.occupation = v.clone();
        }
    }

    /// Keep only the fields whose desired value differs from `current`.
    /// Text fields treat null and "" as the same value.
    pub fn changed_from(&self, current: &Profile) -> ProfilePatch {
        fn text_changed(desired: &Option<Option<String>>, current: &Option<String>) -> Option<Option<String>> {
            let desired = desired.as_ref()?;
            let want = desired.as_deref().unwrap_or("");
            let have = current.as_deref().unwrap_or("");
            (want != have).then(|| desired.clone())
        }

        ProfilePatch {
            id: None,
            display_name: text_changed(&self.display_name, &current.display_name),
            first_name: text_changed(&self.first_name, &current.first_name),
            last_name: text_changed(&self.last_name, &current.last_name),
            age: self.age.filter(|desired| *desired != current.age),
            occupation: text_changed(&self.occupation, &current.occupation),
        }
    }
}

/// Initial profile fields written once at registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub occupation: Option<String>,
}

impl NewProfile {
    /// Build the full document for `id`; identity and email come from the
    /// verified credential, never from the body.
    pub fn into_profile(self, id: &str, email: Option<String>) -> Profile {
        Profile {
            id: id.to_string(),
            email,
            display_name: self.display_name,
            first_name: self.first_name,
            last_name: self.last_name,
            age: self.age,
            occupation: self.occupation,
        }
    }
}
