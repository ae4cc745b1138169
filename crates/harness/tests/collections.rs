use serde_json::json;
use sitecms_core::{CollectionKind, CollectionRef, CoreError, EntityId, ItemKey, shapes::VideoKind};
use sitecms_engine::{EngineError, ErrorClass};
use sitecms_harness::TestSite;
use sitecms_storage::StorageError;

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn set_order_is_all_or_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let a = site.add_case("Alpha")?;
    let b = site.add_case("Beta")?;
    let c = site.add_case("Gamma")?;
    let cases = CollectionRef::cases();
    assert_eq!(site.order(cases)?, vec![a, b, c]);

    site.engine.set_order(cases, &[c, a, b])?;
    assert_eq!(site.order(cases)?, vec![c, a, b]);

    let err = site.engine.set_order(cases, &[a, b]).expect_err("missing id accepted");
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(site.order(cases)?, vec![c, a, b]);

    let err = site
        .engine
        .set_order(cases, &[a, b, b])
        .expect_err("duplicate id accepted");
    assert_eq!(err.class(), ErrorClass::Validation);

    let stranger = ItemKey::new(CollectionKind::Case, EntityId::new());
    let err = site
        .engine
        .set_order(cases, &[c, a, stranger])
        .expect_err("foreign id accepted");
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(site.order(cases)?, vec![c, a, b]);

    Ok(())
}

#[test]
fn gap_after_delete_keeps_relative_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let first = site.add_member("Anna")?;
    let middle = site.add_member("Ben")?;
    let last = site.add_member("Cem")?;
    let team = CollectionRef::team();
    assert_eq!(site.positions(team)?, vec![0, 1, 2]);

    site.engine.remove_item(&middle)?;
    assert_eq!(site.order(team)?, vec![first, last]);
    assert_eq!(site.positions(team)?, vec![0, 2]);

    site.engine.set_order(team, &[first, last])?;
    assert_eq!(site.positions(team)?, vec![0, 1]);

    // An append may tie with a survivor; creation time breaks the tie.
    site.engine.remove_item(&first)?;
    let next = site.add_member("Dora")?;
    assert_eq!(site.order(team)?, vec![last, next]);

    Ok(())
}

#[test]
fn media_lists_are_per_case() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let one = site.add_case("Relaunch")?;
    let two = site.add_case("Shop")?;

    let img_a = site.add_image(&one, "https://cdn.example.com/a.jpg")?;
    let img_b = site.add_image(&one, "https://cdn.example.com/b.jpg")?;
    let img_c = site.add_image(&two, "https://cdn.example.com/c.jpg")?;
    let vid = site.add_video(&one, "https://youtu.be/abc123")?;

    assert_eq!(site.order(CollectionRef::images(one.id()))?, vec![img_a, img_b]);
    assert_eq!(site.order(CollectionRef::images(two.id()))?, vec![img_c]);
    assert_eq!(site.order(CollectionRef::videos(one.id()))?, vec![vid]);
    // Each list numbers from zero.
    assert_eq!(site.positions(CollectionRef::images(two.id()))?, vec![0]);

    let video = site.engine.get_item(&vid)?.expect("video stored");
    assert_eq!(video.payload.get_str("kind"), Some(VideoKind::Youtube.as_str()));
    assert_eq!(video.key().to_string(), format!("vid-{}", vid.id()));

    // Reordering one case's images across cases is a set mismatch.
    let err = site
        .engine
        .set_order(CollectionRef::images(one.id()), &[img_a, img_c])
        .expect_err("image of another case accepted");
    assert_eq!(err.class(), ErrorClass::Validation);

    Ok(())
}

#[test]
fn removing_a_case_removes_its_media() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let case = site.add_case("Relaunch")?;
    let keep = site.add_case("Shop")?;
    let image = site.add_image(&case, "https://cdn.example.com/a.jpg")?;
    let video = site.add_video(&case, "https://vimeo.com/42")?;
    let other = site.add_image(&keep, "https://cdn.example.com/b.jpg")?;

    site.engine.remove_item(&case)?;
    assert!(site.engine.get_item(&case)?.is_none());
    assert!(site.engine.get_item(&image)?.is_none());
    assert!(site.engine.get_item(&video)?.is_none());
    assert!(site.engine.get_item(&other)?.is_some());

    // Removing again is fine.
    site.engine.remove_item(&case)?;
    Ok(())
}

#[test]
fn media_requires_an_existing_case() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let missing = EntityId::new();
    let err = site
        .engine
        .add_item(
            CollectionRef::images(missing),
            json!({"url": "https://cdn.example.com/a.jpg"}),
        )
        .expect_err("orphan image accepted");
    assert!(matches!(err, EngineError::Storage(StorageError::NotFound(_))));

    let member = site.add_member("Anna")?;
    let err = site
        .engine
        .add_item(
            CollectionRef::images(member.id()),
            json!({"url": "https://cdn.example.com/a.jpg"}),
        )
        .expect_err("image under a team member accepted");
    assert_eq!(err.class(), ErrorClass::Validation);

    Ok(())
}

// ============================================================================
// Field updates
// ============================================================================

#[test]
fn update_fields_merges_and_keeps_position() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let _first = site.add_case("Alpha")?;
    let case = site
        .engine
        .add_item(
            CollectionRef::cases(),
            json!({"title": "Beta", "summary": "alt", "client": "ACME"}),
        )?
        .key();

    let updated = site
        .engine
        .update_fields(&case, json!({"summary": "neu", "client": null}))?;
    assert_eq!(updated.position, 1);
    assert_eq!(updated.payload.get_str("title"), Some("Beta"));
    assert_eq!(updated.payload.get_str("summary"), Some("neu"));
    assert!(updated.payload.get("client").is_none());

    // Dropping a required field is rejected and leaves the record as it was.
    let err = site
        .engine
        .update_fields(&case, json!({"title": null}))
        .expect_err("title removal accepted");
    assert_eq!(err.class(), ErrorClass::Validation);
    let stored = site.engine.get_item(&case)?.expect("case stored");
    assert_eq!(stored.payload.get_str("title"), Some("Beta"));

    let gone = ItemKey::new(CollectionKind::Case, EntityId::new());
    let err = site
        .engine
        .update_fields(&gone, json!({"title": "x"}))
        .expect_err("update of missing item accepted");
    assert_eq!(err.class(), ErrorClass::Conflict);

    Ok(())
}

#[test]
fn item_keys_parse_with_prefixes() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let case = site.add_case("Alpha")?;
    let image = site.add_image(&case, "https://cdn.example.com/a.jpg")?;

    let raw = image.to_string();
    assert!(raw.starts_with("img-"));
    assert_eq!(raw.parse::<ItemKey>()?, image);

    for bad in ["", "img", "doc-0190a7b2-7e0c-7000-8000-000000000000", "img-not-a-uuid"] {
        let err = bad.parse::<ItemKey>().expect_err("bad key accepted");
        assert!(matches!(err, CoreError::InvalidItemKey(_)));
        assert_eq!(EngineError::from(err).class(), ErrorClass::Validation);
    }

    Ok(())
}
