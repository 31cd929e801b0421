//! Member lookup on attribute values
//!
//! `<user.name>` asks the resolver for member `name` of whatever `user` is
//! bound to. A miss is never an error: the expression simply has no value.

use crate::value::{HostObject, Member, MemberKind, Value};

/// Finds a named member on a host value
pub trait ModelResolver {
    /// Resolve `member` on `host`, or `None` when there is no visible member
    /// of that name
    fn resolve(&self, host: &Value, member: &str) -> Option<Value>;
}

/// The default search order
///
/// 1. aggregate properties of lists (`first`, `last`, `length`, `size`,
///    `count`, `empty`);
/// 2. map keys, then the pseudo members `keys` and `values`;
/// 3. accessors `get<Name>`, `is<Name>`, `has<Name>`, `<name>`, then the
///    public field `<name>` of host objects. The first accessor that exists
///    answers; if it is not public the member is absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResolver;

impl ModelResolver for DefaultResolver {
    fn resolve(&self, host: &Value, member: &str) -> Option<Value> {
        match host {
            Value::List(items) => list_property(items, member),
            Value::Map(map) => match map.get(member) {
                Some(value) => Some(value.clone()),
                None => match member {
                    "keys" => Some(Value::List(map.keys().cloned().map(Value::Str).collect())),
                    "values" => Some(Value::List(map.values().cloned().collect())),
                    _ => None,
                },
            },
            Value::Object(obj) => object_property(obj.as_ref(), member),
            _ => None,
        }
    }
}

fn list_property(items: &[Value], member: &str) -> Option<Value> {
    match member {
        "first" => items.first().cloned(),
        "last" => items.last().cloned(),
        "length" | "size" | "count" => Some(Value::from(items.len())),
        "empty" => Some(Value::Bool(items.is_empty())),
        _ => None,
    }
}

/// Accessor names tried for `member`, in order
fn accessor_candidates(member: &str) -> Vec<String> {
    let mut chars = member.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return Vec::new(),
    };
    vec![
        format!("get{}", capitalized),
        format!("is{}", capitalized),
        format!("has{}", capitalized),
        member.to_string(),
    ]
}

fn find_visible<'m>(members: &'m [Member], name: &str, kind: MemberKind) -> Option<&'m Member> {
    members
        .iter()
        .find(|m| m.kind == kind && m.name == name && m.visibility.is_public())
}

fn object_property(obj: &dyn HostObject, member: &str) -> Option<Value> {
    let members = obj.members();
    // the first accessor that exists decides; a hidden one hides the field too
    let accessor = accessor_candidates(member).iter().find_map(|name| {
        members
            .iter()
            .find(|m| m.kind == MemberKind::Accessor && &m.name == name)
    });
    let found = match accessor {
        Some(m) if m.visibility.is_public() => m,
        Some(_) => return None,
        None => find_visible(&members, member, MemberKind::Field)?,
    };

    match obj.get(found) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("treating failed member read as absent: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{AccessError, Record, Visibility};
    use std::collections::BTreeMap;

    fn text(value: Option<Value>) -> Option<String> {
        value.and_then(|v| v.as_text())
    }

    #[test]
    fn test_list_aggregates() {
        let list = Value::from(vec!["a", "b", "c"]);
        assert_eq!(text(DefaultResolver.resolve(&list, "first")), Some("a".into()));
        assert_eq!(text(DefaultResolver.resolve(&list, "last")), Some("c".into()));
        assert_eq!(text(DefaultResolver.resolve(&list, "length")), Some("3".into()));
        assert_eq!(text(DefaultResolver.resolve(&list, "count")), Some("3".into()));
        assert!(DefaultResolver.resolve(&list, "bogus").is_none());
    }

    #[test]
    fn test_empty_list_first_is_absent() {
        let list = Value::List(vec![]);
        assert!(DefaultResolver.resolve(&list, "first").is_none());
        assert_eq!(text(DefaultResolver.resolve(&list, "empty")), Some("true".into()));
    }

    #[test]
    fn test_map_keys_and_pseudo_members() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::from("parrt"));
        let host = Value::Map(map);
        assert_eq!(text(DefaultResolver.resolve(&host, "name")), Some("parrt".into()));
        assert!(DefaultResolver.resolve(&host, "age").is_none());
        assert!(matches!(DefaultResolver.resolve(&host, "keys"), Some(Value::List(k)) if k.len() == 1));
    }

    #[test]
    fn test_getter_preferred_over_field() {
        let user = Record::new("User")
            .with_field("name", Visibility::Public, "field")
            .with_accessor("getName", Visibility::Public, "getter")
            .into_value();
        assert_eq!(text(DefaultResolver.resolve(&user, "name")), Some("getter".into()));
    }

    #[test]
    fn test_is_and_has_accessors() {
        let user = Record::new("User")
            .with_accessor("isAdmin", Visibility::Public, true)
            .with_accessor("hasPhone", Visibility::Public, false)
            .into_value();
        assert_eq!(text(DefaultResolver.resolve(&user, "admin")), Some("true".into()));
        assert_eq!(text(DefaultResolver.resolve(&user, "phone")), Some("false".into()));
    }

    #[test]
    fn test_hidden_accessor_and_field_are_absent() {
        let user = Record::new("UserHiddenName")
            .with_field("name", Visibility::Protected, "parrt")
            .with_accessor("getName", Visibility::Protected, "parrt")
            .into_value();
        assert!(DefaultResolver.resolve(&user, "name").is_none());
    }

    #[test]
    fn test_hidden_accessor_hides_public_field() {
        let user = Record::new("User")
            .with_accessor("getName", Visibility::Private, "hidden")
            .with_field("name", Visibility::Public, "visible")
            .into_value();
        assert!(DefaultResolver.resolve(&user, "name").is_none());
    }

    #[test]
    fn test_hidden_is_accessor_stops_search() {
        let user = Record::new("User")
            .with_accessor("isActive", Visibility::Protected, true)
            .with_accessor("active", Visibility::Public, false)
            .into_value();
        assert!(DefaultResolver.resolve(&user, "active").is_none());
    }

    #[test]
    fn test_member_names_are_case_sensitive() {
        let user = Record::new("User")
            .with_field("Name", Visibility::Public, "parrt")
            .into_value();
        assert!(DefaultResolver.resolve(&user, "name").is_none());
    }

    #[derive(Debug)]
    struct Failing;

    impl HostObject for Failing {
        fn type_name(&self) -> &str {
            "Failing"
        }

        fn members(&self) -> Vec<Member> {
            vec![Member::accessor("getBoom", Visibility::Public)]
        }

        fn get(&self, member: &Member) -> Result<Value, AccessError> {
            Err(AccessError {
                type_name: "Failing".to_string(),
                member: member.name.clone(),
                reason: "accessor threw".to_string(),
            })
        }
    }

    #[test]
    fn test_failing_accessor_is_absent() {
        let host = Value::Object(std::rc::Rc::new(Failing));
        assert!(DefaultResolver.resolve(&host, "boom").is_none());
    }

    #[test]
    fn test_scalars_have_no_members() {
        assert!(DefaultResolver.resolve(&Value::from("abc"), "length").is_none());
        assert!(DefaultResolver.resolve(&Value::Absent, "x").is_none());
    }
}
