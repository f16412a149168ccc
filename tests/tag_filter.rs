use anyhow::Result;
use oorandom::Rand64;

use backup_monkey::error::ErrorKind;
use backup_monkey::filter::{TagFilter, TagValue};
use backup_monkey::model::Volume;

#[test]
fn literal_and_list_values() -> Result<()> {
    let f = TagFilter::parse(&["env:[prod,staging]", "owner:alice"], false)?;
    assert_eq!(f.len(), 2);
    assert_eq!(
        f.get("env"),
        Some(&TagValue::AnyOf(vec!["prod".into(), "staging".into()]))
    );
    assert_eq!(f.get("owner"), Some(&TagValue::One("alice".into())));
    Ok(())
}

#[test]
fn inclusive_keys_get_provider_prefix() -> Result<()> {
    let f = TagFilter::parse(&["env:prod", "team:[a,b]"], false)?;
    assert_eq!(f.keys(), vec!["tag:env".to_string(), "tag:team".to_string()]);

    let pf = f.provider_filters();
    assert_eq!(pf.get("tag:env"), Some(&["prod".to_string()][..]));
    assert_eq!(pf.get("tag:team"), Some(&["a".to_string(), "b".to_string()][..]));
    Ok(())
}

#[test]
fn inverted_keys_stay_bare() -> Result<()> {
    let f = TagFilter::parse(&["env:[prod,staging]"], true)?;
    assert!(f.is_inverted());
    assert_eq!(f.keys(), vec!["env".to_string()]);

    let set = f.exclusion_set();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&("env".to_string(), "prod".to_string())));
    assert!(set.contains(&("env".to_string(), "staging".to_string())));
    Ok(())
}

#[test]
fn entries_must_split_into_exactly_two_parts() {
    for bad in ["noseparator", "a:b:c", ":value", "key:", "  :  "] {
        let err = TagFilter::parse(&[bad], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFilterFormat, "entry {bad:?}");
    }
}

#[test]
fn malformed_list_is_an_error_not_a_literal() {
    let err = TagFilter::parse(&["env:[prod,,staging]"], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilterFormat);
    let err = TagFilter::parse(&["env:['prod]"], true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilterFormat);
}

#[test]
fn last_duplicate_key_wins() -> Result<()> {
    let f = TagFilter::parse(&["env:prod", "env:dev"], false)?;
    assert_eq!(f.len(), 1);
    assert_eq!(f.get("env"), Some(&TagValue::One("dev".into())));
    Ok(())
}

#[test]
fn inverted_example_from_blacklist() -> Result<()> {
    let f = TagFilter::parse(&["env:[prod,staging]"], true)?;
    let dev = Volume::new("vol-dev").with_tag("env", "dev");
    let prod = Volume::new("vol-prod").with_tag("env", "prod");
    let untagged = Volume::new("vol-bare");
    assert!(!f.excludes(&dev));
    assert!(f.excludes(&prod));
    assert!(!f.excludes(&untagged));
    Ok(())
}

#[test]
fn quoted_scalar_blacklist_matches_bare_tag() -> Result<()> {
    let f = TagFilter::parse(&["env:\"prod\"", "team:'ops'"], true)?;
    assert_eq!(f.get("env"), Some(&TagValue::One("prod".into())));
    assert_eq!(f.get("team"), Some(&TagValue::One("ops".into())));

    assert!(f.excludes(&Volume::new("vol-1").with_tag("env", "prod")));
    assert!(f.excludes(&Volume::new("vol-2").with_tag("team", "ops")));
    assert!(!f.excludes(&Volume::new("vol-3").with_tag("env", "dev")));

    let inc = TagFilter::parse(&["env:'prod'"], false)?;
    assert_eq!(inc.provider_filters().get("tag:env"), Some(&["prod".to_string()][..]));
    Ok(())
}

const KEYS: [&str; 3] = ["env", "team", "tier"];
const VALUES: [&str; 4] = ["a", "b", "c", "d"];

fn random_volume(rng: &mut Rand64, i: usize) -> Volume {
    let mut v = Volume::new(format!("vol-{i}"));
    for k in KEYS {
        if rng.rand_range(0..3) > 0 {
            v = v.with_tag(k, VALUES[rng.rand_range(0..VALUES.len() as u64) as usize]);
        }
    }
    v
}

fn random_specs(rng: &mut Rand64) -> Vec<String> {
    let mut specs = Vec::new();
    for k in KEYS {
        match rng.rand_range(0..3) {
            0 => {}
            1 => specs.push(format!("{k}:{}", VALUES[rng.rand_range(0..4) as usize])),
            _ => {
                let a = VALUES[rng.rand_range(0..4) as usize];
                let b = VALUES[rng.rand_range(0..4) as usize];
                specs.push(format!("{k}:[{a}, '{b}']"));
            }
        }
    }
    specs
}

#[test]
fn randomized_inclusive_and_inverted_semantics() -> Result<()> {
    let mut rng = Rand64::new(0xB4C_0FF);
    for round in 0..300 {
        let specs = random_specs(&mut rng);
        let inc = TagFilter::parse(&specs, false)?;
        let inv = TagFilter::parse(&specs, true)?;
        let pf = inc.provider_filters();
        let blacklist = inv.exclusion_set();

        for i in 0..8 {
            let v = random_volume(&mut rng, i);

            // inclusive: every key present with an accepted value
            let expected = KEYS.iter().all(|k| match inc.get(k) {
                None => true,
                Some(val) => v.tags.get(*k).map_or(false, |t| val.accepts(t)),
            });
            assert_eq!(inc.matches(&v), expected, "round {round} specs {specs:?} vol {v:?}");
            assert_eq!(pf.matches(&v), expected, "provider semantics differ, round {round}");

            // inverted: selected iff no tag pair is blacklisted
            let hit = v
                .tags
                .iter()
                .any(|(k, val)| blacklist.contains(&(k.clone(), val.clone())));
            assert_eq!(inv.excludes(&v), hit, "round {round} specs {specs:?} vol {v:?}");
        }
    }
    Ok(())
}
