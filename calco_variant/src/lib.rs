pub mod variant;
pub use variant::*;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;

    // -------------------- Number Tests --------------------

    #[test]
    fn test_number_type_checks() {
        assert!(Number::I64(42).is_int());
        assert!(Number::U64(100).is_int());
        assert!(!Number::F64(3.14).is_int());
        assert!(Number::F64(2.71).is_float());
        assert!(!Number::I64(42).is_float());
    }

    #[test]
    fn test_number_as_i64_lossy() {
        assert_eq!(Number::I64(-5).as_i64_lossy(), Some(-5i64));
        assert_eq!(Number::U64(1000).as_i64_lossy(), Some(1000i64));
        assert_eq!(Number::U64(u64::MAX).as_i64_lossy(), None);
        assert_eq!(Number::F64(3.14).as_i64_lossy(), None);
    }

    #[test]
    fn test_number_as_f64_lossy() {
        assert_eq!(Number::I64(42).as_f64_lossy(), 42.0);
        assert_eq!(Number::U64(100).as_f64_lossy(), 100.0);
        assert_eq!(Number::F64(2.71).as_f64_lossy(), 2.71);
    }

    // -------------------- Constructors & accessors --------------------

    #[test]
    fn test_constructors() {
        assert!(Value::null().is_null());
        assert_eq!(Value::string("hi").as_str(), Some("hi"));
        assert_eq!(Value::vec3(1.0, 2.0, 3.0).as_seq(), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(
            Value::vec4(0.0, 0.0, 0.0, 1.0).as_seq(),
            Some(&[0.0, 0.0, 0.0, 1.0][..])
        );
    }

    #[test]
    fn test_accessors_reject_wrong_shape() {
        let v = Value::from(3.5f64);
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_seq(), None);
        assert_eq!(v.as_f64(), Some(3.5));
        assert_eq!(v.as_i64(), None);

        let whole = Value::from(3.0f64);
        assert_eq!(whole.as_i64(), Some(3));
        assert_eq!(whole.as_u64(), Some(3));
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(Value::Null.shape_name(), "null");
        assert_eq!(Value::from(true).shape_name(), "bool");
        assert_eq!(Value::from(1i64).shape_name(), "number");
        assert_eq!(Value::string("x").shape_name(), "string");
        assert_eq!(Value::vec3(0.0, 0.0, 0.0).shape_name(), "sequence");
        assert_eq!(Value::map().shape_name(), "map");
        assert_eq!(Value::from(SymbolicRef::uuid("abcd")).shape_name(), "reference");
    }

    // -------------------- approx_eq --------------------

    #[test]
    fn test_approx_eq_numbers() {
        let a = Value::from(1.0f64);
        let b = Value::from(1.0f64 + 1e-9);
        let c = Value::from(1.1f64);
        assert!(a.approx_eq(&b, NUMERIC_TOLERANCE));
        assert!(!a.approx_eq(&c, NUMERIC_TOLERANCE));
        // Integer and float representations of the same value compare equal.
        assert!(Value::from(2i64).approx_eq(&Value::from(2.0f64), NUMERIC_TOLERANCE));
    }

    #[test]
    fn test_approx_eq_sequences() {
        let a = Value::vec3(1.0, 2.0, 3.0);
        let b = Value::Seq(vec![1.0, 2.0, 3.0 + 1e-9]);
        let short = Value::Seq(vec![1.0, 2.0]);
        assert!(a.approx_eq(&b, NUMERIC_TOLERANCE));
        assert!(!a.approx_eq(&short, NUMERIC_TOLERANCE));
    }

    #[test]
    fn test_approx_eq_shapes_never_cross() {
        assert!(!Value::from(1.0f64).approx_eq(&Value::Seq(vec![1.0]), NUMERIC_TOLERANCE));
        assert!(!Value::from(true).approx_eq(&Value::from(1i64), NUMERIC_TOLERANCE));
    }

    #[test]
    fn test_approx_eq_maps() {
        let mut a = BTreeMap::new();
        a.insert(Arc::<str>::from("r"), Value::from(0.5f64));
        a.insert(Arc::<str>::from("g"), Value::from(0.25f64));
        let mut b = a.clone();
        assert!(Value::Map(a.clone()).approx_eq(&Value::Map(b.clone()), NUMERIC_TOLERANCE));

        b.insert(Arc::<str>::from("g"), Value::from(0.75f64));
        assert!(!Value::Map(a).approx_eq(&Value::Map(b), NUMERIC_TOLERANCE));
    }

    // -------------------- JSON round-trips --------------------

    #[test]
    fn test_json_roundtrip_scalars() {
        for v in [
            Value::Null,
            Value::from(true),
            Value::from(-7i64),
            Value::from(42u64),
            Value::string("res://light.tres"),
        ] {
            let json = v.to_json_value();
            let back = Value::from_json_value(json).unwrap();
            assert!(v.approx_eq(&back, NUMERIC_TOLERANCE), "roundtrip failed for {v}");
        }
    }

    #[test]
    fn test_json_roundtrip_seq_and_map() {
        let seq = Value::vec4(1.0, 0.5, 0.25, 1.0);
        let back = Value::from_json_value(seq.to_json_value()).unwrap();
        assert!(seq.approx_eq(&back, NUMERIC_TOLERANCE));

        let mut map = BTreeMap::new();
        map.insert(Arc::<str>::from("intensity"), Value::from(2.0f64));
        map.insert(Arc::<str>::from("enabled"), Value::from(true));
        let map = Value::Map(map);
        let back = Value::from_json_value(map.to_json_value()).unwrap();
        assert!(map.approx_eq(&back, NUMERIC_TOLERANCE));
    }

    #[test]
    fn test_symbolic_ref_roundtrip() {
        let r = Value::from(SymbolicRef::uuid("f00d-beef"));
        let json = r.to_json_value();
        assert_eq!(json["kind"], "uuid");
        assert_eq!(json["value"], "f00d-beef");

        let back = Value::from_json_value(json).unwrap();
        assert_eq!(back, r);

        let named = Value::from(SymbolicRef::name("MainCamera"));
        let back = Value::from_json_value(named.to_json_value()).unwrap();
        assert_eq!(back, named);
    }

    #[test]
    fn test_plain_map_not_mistaken_for_ref() {
        // Same key count but wrong keys: stays a map.
        let json = serde_json::json!({"kind": "uuid", "other": "x"});
        let v = Value::from_json_value(json).unwrap();
        assert!(matches!(v, Value::Map(_)));

        // Three keys: stays a map even with kind/value present.
        let json = serde_json::json!({"kind": "uuid", "value": "x", "extra": 1});
        let v = Value::from_json_value(json).unwrap();
        assert!(matches!(v, Value::Map(_)));
    }

    #[test]
    fn test_non_numeric_array_is_rejected() {
        let json = serde_json::json!([1.0, "two", 3.0]);
        assert!(Value::from_json_value(json).is_err());
    }

    #[test]
    fn test_serde_through_string() {
        let v = Value::vec3(4.0, 5.0, 6.0);
        let text = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert!(v.approx_eq(&back, NUMERIC_TOLERANCE));
    }
}
