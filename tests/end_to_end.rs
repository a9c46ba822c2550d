use rayon::prelude::*;
use relay::dsl::{self, CompareOp, Literal, Node};
use relay::registry::{MemberSet, ObjectRef, TypeKey, Value};
use relay::{EvalError, FilterParser, ParseError, Record, Registry, WhitelistConfig};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use time::macros::datetime;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct House {
    title: String,
}

impl Record for House {
    fn members() -> MemberSet<Self> {
        MemberSet::new().field("Title", |h: &House| &h.title)
    }
}

struct Critter {
    name: String,
    age: u32,
    born: OffsetDateTime,
    dwelling: Option<House>,
}

impl Record for Critter {
    fn members() -> MemberSet<Self> {
        MemberSet::new()
            .field("Name", |c: &Critter| &c.name)
            .field("Age", |c: &Critter| &c.age)
            .field("Born", |c: &Critter| &c.born)
            .field("Dwelling", |c: &Critter| &c.dwelling)
    }
}

struct Switches {
    a: bool,
    b: bool,
    c: bool,
}

struct Vault;

fn critter(name: &str, house: Option<&str>) -> Critter {
    Critter {
        name: name.to_string(),
        age: 7,
        born: datetime!(2019-03-01 08:30 UTC),
        dwelling: house.map(|title| House {
            title: title.to_string(),
        }),
    }
}

fn critter_parser() -> FilterParser {
    init_tracing();
    let registry = Registry::builder()
        .configure::<Critter>(|t| t.whitelist_all())
        .configure::<House>(|t| t.whitelist("Title"))
        .build()
        .unwrap();
    FilterParser::new(registry)
}

#[test]
fn not_equal_negates_equality() {
    init_tracing();
    let parser = FilterParser::new(Registry::default());
    let predicate = parser.parse::<String>("true != false").unwrap();
    assert_eq!(
        *predicate.body(),
        Node::not(Node::compare(
            CompareOp::Eq,
            Node::literal(Literal::Bool(true)),
            Node::literal(Literal::Bool(false)),
        ))
    );
    assert_eq!(predicate.to_string(), "!(true = false)");
    assert!(predicate.evaluate(&String::new()).unwrap());
}

#[test]
fn mixed_logical_operators() {
    let parser = FilterParser::new(Registry::default());
    let predicate = parser
        .parse::<String>("true and false or false and true")
        .unwrap();
    assert!(!predicate.evaluate(&String::new()).unwrap());
}

#[test]
fn or_chains_nest_to_the_right() {
    let registry = Registry::builder()
        .configure::<Switches>(|t| {
            t.field("a", |s: &Switches| &s.a)
                .field("b", |s: &Switches| &s.b)
                .field("c", |s: &Switches| &s.c)
        })
        .build()
        .unwrap();
    let parser = FilterParser::new(registry);
    let body = parser.parse::<Switches>("a or b or c").unwrap().into_body();

    let Node::Logical { rhs, .. } = &body else {
        panic!("expected a logical node, got {body}");
    };
    assert!(matches!(**rhs, Node::Logical { .. }));
    assert_eq!(body.to_string(), "(a or (b or c))");
    assert_eq!(
        parser
            .parse::<Switches>("a and b and c")
            .unwrap()
            .to_string(),
        "(a and (b and c))"
    );
}

#[test]
fn string_length() {
    let registry = Registry::builder()
        .configure::<String>(|t| t.computed("Length", |s: &String| s.len()))
        .build()
        .unwrap();
    let parser = FilterParser::new(registry);

    let longer = parser.parse::<String>("Length > 10").unwrap();
    let Node::Compare { op, lhs, rhs } = longer.body() else {
        panic!("expected a comparison");
    };
    assert_eq!(*op, CompareOp::Gt);
    assert!(matches!(**lhs, Node::Member(_)));
    assert_eq!(**rhs, Node::literal(Literal::Number(Decimal::from(10))));

    assert!(longer.evaluate(&"hello world".to_string()).unwrap());
    assert!(!longer.evaluate(&"hi".to_string()).unwrap());

    let exact = parser.parse::<String>("Length = 10").unwrap();
    assert!(exact.evaluate(&"0123456789".to_string()).unwrap());
    assert!(!exact.evaluate(&"hello world".to_string()).unwrap());
}

#[test]
fn escaped_quotes() {
    let parser = FilterParser::new(Registry::default());
    let predicate = parser.parse::<String>(r"'\'' = '\''").unwrap();
    assert!(predicate.evaluate(&String::new()).unwrap());
}

#[test]
fn date_literals() {
    let parser = FilterParser::new(Registry::default());
    let earlier = parser
        .parse::<String>("2019-01-01T12:00:00+01:00 < 2019-01-02T12:00:00+01:00")
        .unwrap();
    let Node::Compare { op, .. } = earlier.body() else {
        panic!("expected a comparison");
    };
    assert_eq!(*op, CompareOp::Lt);
    assert!(earlier.evaluate(&String::new()).unwrap());

    let short_offset = parser
        .parse::<String>("2019-01-01T12:00:00+01 < 2019-01-02T12:00:00+01")
        .unwrap();
    assert!(short_offset.evaluate(&String::new()).unwrap());
}

#[test]
fn member_timestamps_and_coercion() {
    let parser = critter_parser();
    let subject = critter("Paul", None);

    let before = parser.parse::<Critter>("Born < 2020-01-01").unwrap();
    assert!(before.evaluate(&subject).unwrap());

    let coerced = parser.parse::<Critter>("Born >= '2019-06-01'").unwrap();
    assert!(!coerced.evaluate(&subject).unwrap());

    let age = parser.parse::<Critter>("age >= 7 and age < '8'").unwrap();
    assert!(age.evaluate(&subject).unwrap());
}

#[test]
fn alternatives_over_nested_members() {
    let parser = critter_parser();
    let predicate = parser
        .parse::<Critter>("Dwelling.Title = 'House Harkonnen',Dwelling.Title = 'House Atreides'")
        .unwrap();

    assert!(predicate.evaluate(&critter("Paul", Some("House Atreides"))).unwrap());
    assert!(predicate.evaluate(&critter("Feyd", Some("House Harkonnen"))).unwrap());
    assert!(!predicate.evaluate(&critter("Shaddam", Some("House Corrino"))).unwrap());
}

#[test]
fn null_safe_chain_yields_null() {
    let parser = critter_parser();
    let predicate = parser.parse::<Critter>("Dwelling?.Title = 'X'").unwrap();
    let homeless = critter("Stilgar", None);

    let Node::Compare { lhs, .. } = predicate.body() else {
        panic!("expected a comparison");
    };
    assert!(lhs.value_type().nullable);
    assert_eq!(
        dsl::evaluate(lhs, ObjectRef::new(&homeless)).unwrap(),
        Value::Null
    );

    assert!(!predicate.evaluate(&homeless).unwrap());
    assert!(predicate.evaluate(&critter("Jessica", Some("X"))).unwrap());
    assert!(!predicate.evaluate(&critter("Leto", Some("Y"))).unwrap());
}

#[test]
fn plain_chain_through_null_fails() {
    let parser = critter_parser();
    let predicate = parser.parse::<Critter>("Dwelling.Title = 'X'").unwrap();
    assert_eq!(
        predicate.evaluate(&critter("Stilgar", None)).unwrap_err(),
        EvalError::NullReference {
            member: "Title".into(),
        }
    );
}

#[test]
fn null_literals() {
    let parser = critter_parser();
    let homeless = parser.parse::<Critter>("Dwelling = null").unwrap();
    assert!(homeless.evaluate(&critter("Stilgar", None)).unwrap());
    assert!(!homeless.evaluate(&critter("Paul", Some("House Atreides"))).unwrap());

    let housed = parser.parse::<Critter>("Dwelling != null").unwrap();
    assert!(housed.evaluate(&critter("Paul", Some("House Atreides"))).unwrap());
}

#[test]
fn unregistered_members_fail_closed() {
    init_tracing();
    let registry = Registry::builder()
        .configure::<House>(|t| t.whitelist_all())
        .build()
        .unwrap();
    let parser = FilterParser::new(registry);

    let err = parser.parse::<Vault>("secret = 'x'").unwrap_err();
    assert_eq!(
        err,
        ParseError::Resolution {
            offset: 0,
            member: "secret".into(),
            owner: "Vault".into(),
        }
    );

    let err = parser.parse::<Vault>("true or Secret = 'x'").unwrap_err();
    assert_eq!(err.offset(), 8);
}

#[test]
fn unwhitelisted_member_of_known_type_fails() {
    let registry = Registry::builder()
        .configure::<Critter>(|t| t.whitelist("Dwelling"))
        .build()
        .unwrap();
    let parser = FilterParser::new(registry);
    let err = parser.parse::<Critter>("Dwelling?.Title = 'X'").unwrap_err();
    assert!(matches!(
        err,
        ParseError::Resolution { offset: 10, ref owner, .. } if owner == "House"
    ));
    assert!(parser.parse::<Critter>("Name = 'Paul'").is_err());
}

#[test]
fn whitelist_from_config() {
    let config = WhitelistConfig::from_yaml_str(
        "
types:
  critter: [Name, Dwelling]
  house: all
",
    )
    .unwrap();
    let registry = Registry::builder()
        .declare::<Critter>()
        .declare::<House>()
        .apply_config(&config)
        .build()
        .unwrap();
    let parser = FilterParser::new(registry);

    let predicate = parser
        .parse::<Critter>("Name = 'Paul' and Dwelling?.Title = 'House Atreides'")
        .unwrap();
    assert!(predicate.evaluate(&critter("Paul", Some("House Atreides"))).unwrap());
    assert!(matches!(
        parser.parse::<Critter>("Age > 3").unwrap_err(),
        ParseError::Resolution { .. }
    ));
}

#[test]
fn display_parses_back_to_the_same_tree() {
    let parser = critter_parser();
    let sources = [
        "Born < 2019-01-01T12:00:00.250Z",
        "Born >= 2019-06-01T08:30:00.007-05:30 and Born < 2020-01-01",
        r"Dwelling?.Title = 'it\'s \\ a\nb\t'",
        "!(Age > 3) or Name != 'x'",
        "2019-01-01T12:00:00.250Z < 2019-01-02",
    ];

    for source in sources {
        let first = parser.parse::<Critter>(source).unwrap();
        let rendered = first.to_string();
        let second = parser
            .parse::<Critter>(&rendered)
            .unwrap_or_else(|err| panic!("{rendered:?} from {source:?}: {err}"));
        assert_eq!(first.body(), second.body(), "{source:?} rendered as {rendered:?}");
        assert_eq!(second.to_string(), rendered);
    }
}

#[test]
fn parse_node_accepts_a_type_key() {
    let parser = critter_parser();
    let node = parser
        .parse_node("Name = 'Paul'", TypeKey::of::<Critter>())
        .unwrap();
    let paul = critter("Paul", None);
    assert_eq!(
        dsl::evaluate(&node, ObjectRef::new(&paul)).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn one_parser_many_threads() {
    let parser = critter_parser();
    let subject = critter("Paul", Some("House Atreides"));

    let results: Vec<bool> = (0u32..64)
        .into_par_iter()
        .map(|limit| {
            let predicate = parser
                .parse::<Critter>(&format!("Age > {} and Dwelling?.Title = 'House Atreides'", limit))
                .unwrap();
            predicate.evaluate(&subject).unwrap()
        })
        .collect();

    for (limit, matched) in results.into_iter().enumerate() {
        assert_eq!(matched, limit < 7, "limit {}", limit);
    }
}
