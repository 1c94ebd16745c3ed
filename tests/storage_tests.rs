use chrono::NaiveDate;
use shelter_records::storage::models::{AnimalFilter, AnimalPatch, NewAnimal, Patch};
use shelter_records::storage::{Database, RecordStore};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_animal(name: &str, species: &str, photo: &str) -> NewAnimal {
    NewAnimal {
        name: name.to_string(),
        species: species.to_string(),
        birth_date: Some(date(2020, 3, 1)),
        rescue_date: date(2024, 6, 15),
        description: "Found near the river".to_string(),
        adopted: false,
        photo_ref: Some(photo.to_string()),
    }
}

#[test]
fn test_create_and_get_animal() {
    let (_dir, db) = test_db();

    let created = db
        .create_animal(sample_animal("Rex", "dog", "rex.png"))
        .unwrap();
    assert_eq!(created.id, 1);

    let retrieved = db.get_animal(created.id).unwrap().expect("animal should exist");
    assert_eq!(retrieved, created);
    assert_eq!(retrieved.name, "Rex");
    assert_eq!(retrieved.species, "dog");
    assert_eq!(retrieved.birth_date, Some(date(2020, 3, 1)));
    assert_eq!(retrieved.rescue_date, date(2024, 6, 15));
    assert!(!retrieved.adopted);
    assert_eq!(retrieved.photo_ref.as_deref(), Some("rex.png"));
}

#[test]
fn test_ids_are_sequential_and_not_reused() {
    let (_dir, db) = test_db();

    let first = db.create_animal(sample_animal("A", "dog", "a.png")).unwrap();
    let second = db.create_animal(sample_animal("B", "cat", "b.png")).unwrap();
    assert_eq!(second.id, first.id + 1);

    db.delete_animal(second.id).unwrap();
    let third = db.create_animal(sample_animal("C", "cat", "c.png")).unwrap();
    assert_eq!(third.id, second.id + 1);
}

#[test]
fn test_ids_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");

    {
        let db = Database::open(&data_dir).unwrap();
        db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();
    }

    let db = Database::open(&data_dir).unwrap();
    assert!(db.get_animal(1).unwrap().is_some());
    let next = db.create_animal(sample_animal("Mia", "cat", "mia.png")).unwrap();
    assert_eq!(next.id, 2);
}

#[test]
fn test_get_animal_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_animal(42).unwrap().is_none());
}

#[test]
fn test_list_animals_with_filter() {
    let (_dir, db) = test_db();
    db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();
    db.create_animal(sample_animal("Mia", "Cat", "mia.png")).unwrap();
    let bolt = db.create_animal(sample_animal("Bolt", "dog", "bolt.png")).unwrap();

    let all = db.list_animals(&AnimalFilter::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));

    let cats = db
        .list_animals(&AnimalFilter {
            species: Some("cat".to_string()),
            adopted: None,
        })
        .unwrap();
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0].name, "Mia");

    let patch = AnimalPatch {
        adopted: Some(true),
        ..Default::default()
    };
    db.update_animal(bolt.id, &patch).unwrap();

    let adopted = db
        .list_animals(&AnimalFilter {
            species: None,
            adopted: Some(true),
        })
        .unwrap();
    assert_eq!(adopted.len(), 1);
    assert_eq!(adopted[0].id, bolt.id);
}

#[test]
fn test_update_merges_present_fields_only() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();

    let patch = AnimalPatch {
        name: Some("Rex II".to_string()),
        birth_date: Patch::Null,
        ..Default::default()
    };
    let update = db
        .update_animal(created.id, &patch)
        .unwrap()
        .expect("animal should exist");

    assert!(update.replaced_photo.is_none());
    let animal = update.animal;
    assert_eq!(animal.name, "Rex II");
    assert_eq!(animal.birth_date, None);
    assert_eq!(animal.species, created.species);
    assert_eq!(animal.rescue_date, created.rescue_date);
    assert_eq!(animal.description, created.description);
    assert_eq!(animal.photo_ref, created.photo_ref);
    assert_eq!(animal.created_at, created.created_at);
    assert!(animal.updated_at >= created.updated_at);

    assert_eq!(db.get_animal(created.id).unwrap().unwrap(), animal);
}

#[test]
fn test_update_can_unadopt() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();

    let adopt = AnimalPatch {
        adopted: Some(true),
        ..Default::default()
    };
    assert!(db.update_animal(created.id, &adopt).unwrap().unwrap().animal.adopted);

    let unadopt = AnimalPatch {
        adopted: Some(false),
        ..Default::default()
    };
    assert!(!db.update_animal(created.id, &unadopt).unwrap().unwrap().animal.adopted);
}

#[test]
fn test_update_reports_replaced_photo() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "b1.png")).unwrap();

    let patch = AnimalPatch {
        photo_ref: Some("b2.png".to_string()),
        ..Default::default()
    };
    let update = db.update_animal(created.id, &patch).unwrap().unwrap();
    assert_eq!(update.replaced_photo.as_deref(), Some("b1.png"));
    assert_eq!(update.animal.photo_ref.as_deref(), Some("b2.png"));

    // Setting the same reference again displaces nothing
    let update = db.update_animal(created.id, &patch).unwrap().unwrap();
    assert!(update.replaced_photo.is_none());
}

#[test]
fn test_update_not_found() {
    let (_dir, db) = test_db();
    let patch = AnimalPatch {
        name: Some("Ghost".to_string()),
        ..Default::default()
    };
    assert!(db.update_animal(99, &patch).unwrap().is_none());
    assert!(db.list_animals(&AnimalFilter::default()).unwrap().is_empty());
}

#[test]
fn test_patch_is_empty() {
    assert!(AnimalPatch::default().is_empty());

    let patch = AnimalPatch {
        birth_date: Patch::Null,
        ..Default::default()
    };
    assert!(!patch.is_empty());
}

#[test]
fn test_empty_patch_is_a_read() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();

    let update = db
        .update_animal(created.id, &AnimalPatch::default())
        .unwrap()
        .expect("row should exist");
    assert_eq!(update.animal, created);
    assert_eq!(update.animal.updated_at, created.updated_at);
    assert!(update.replaced_photo.is_none());

    assert!(db.update_animal(created.id + 1, &AnimalPatch::default()).unwrap().is_none());
}

#[test]
fn test_delete_animal_returns_row() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();

    let removed = db.delete_animal(created.id).unwrap().expect("row should be returned");
    assert_eq!(removed, created);
    assert!(db.get_animal(created.id).unwrap().is_none());

    assert!(db.delete_animal(created.id).unwrap().is_none());
}

#[test]
fn test_find_photo_ref() {
    let (_dir, db) = test_db();
    let created = db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();

    assert_eq!(
        db.find_photo_ref(created.id).unwrap().as_deref(),
        Some("rex.png")
    );
    assert!(db.find_photo_ref(created.id + 1).unwrap().is_none());
}

#[test]
fn test_purge_all() {
    let (_dir, db) = test_db();
    db.create_animal(sample_animal("Rex", "dog", "rex.png")).unwrap();
    let mut no_photo = sample_animal("Mia", "cat", "unused");
    no_photo.photo_ref = None;
    db.create_animal(no_photo).unwrap();

    let stats = db.purge_all().unwrap();
    assert_eq!(stats.animals, 2);
    assert_eq!(stats.photo_refs, vec!["rex.png".to_string()]);
    assert!(db.list_animals(&AnimalFilter::default()).unwrap().is_empty());

    let next = db.create_animal(sample_animal("Bolt", "dog", "bolt.png")).unwrap();
    assert_eq!(next.id, 3);
}
