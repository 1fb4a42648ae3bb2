//! Built-in catalog contents.

use rolebot::catalog::{Catalog, DEFAULT_ROLE_ID};

#[test]
fn roles_are_listed_in_display_order() {
    let catalog = Catalog::builtin();
    assert_eq!(
        catalog.roles.list_ids(),
        vec!["default", "travel", "english", "entertainer", "nutrition", "feynman"]
    );
    assert!(catalog.roles.contains(DEFAULT_ROLE_ID));
}

#[test]
fn stock_bindings_match_the_catalog() {
    let catalog = Catalog::builtin();
    let expected = [
        ("default", "warm_caring"),
        ("travel", "enthusiastic_explorer"),
        ("english", "patient_mentor"),
        ("entertainer", "humorous_friend"),
        ("nutrition", "warm_caring"),
        ("feynman", "socratic_teacher"),
    ];
    for (role, personality) in expected {
        assert_eq!(
            catalog.roles.personality_id(role).as_deref(),
            Some(personality),
            "{role}"
        );
    }
}

#[test]
fn personality_list_is_sorted_by_id() {
    let catalog = Catalog::builtin();
    let listed: Vec<String> = catalog.personalities.list().into_keys().collect();
    assert_eq!(
        listed,
        vec![
            "enthusiastic_explorer",
            "humorous_friend",
            "patient_mentor",
            "socratic_teacher",
            "warm_caring",
        ]
    );
    assert_eq!(
        catalog.personalities.list().get("warm_caring").map(String::as_str),
        Some("温柔助理型")
    );
}

#[test]
fn every_personality_has_three_fragments() {
    let catalog = Catalog::builtin();
    for personality in catalog.personalities.all() {
        assert!(!personality.fragments.system_prompt.trim().is_empty(), "{}", personality.id);
        assert!(personality.fragments.behavior_guide.starts_with("行为准则"), "{}", personality.id);
        assert!(personality.fragments.response_style.starts_with("表达风格"), "{}", personality.id);
    }
}

#[test]
fn listing_is_numbered() {
    let listing = Catalog::builtin().roles.render_listing();
    assert!(listing.starts_with("Available roles:\n1. default - 贴心生活助手\n2. travel - 旅游规划助手\n"));
    assert!(listing.contains("6. feynman - 知识巩固教练"));
    assert!(listing.ends_with("Use '/role <id>' to switch roles."));
}

#[test]
fn catalogs_are_independent() {
    let first = Catalog::builtin();
    let second = Catalog::builtin();
    first
        .roles
        .rebind_personality("travel", "humorous_friend")
        .expect("rebind");
    assert_eq!(
        second.roles.personality_id("travel").as_deref(),
        Some("enthusiastic_explorer")
    );
}
