use shopfront_taxonomy::Attribute;
use shopfront_taxonomy::Category;
use shopfront_taxonomy::Subcategory;
use shopfront_taxonomy::Taxonomy;

fn subcategory(id: &str, category: &str, kind: &str, attributes: &[(&str, &str)]) -> Subcategory {
    Subcategory {
        id: id.into(),
        category_id: category.into(),
        name: kind.to_string(),
        kind: kind.to_string(),
        attributes: attributes
            .iter()
            .map(|(attribute, label)| Attribute {
                id: (*attribute).into(),
                subcategory_id: id.into(),
                label: (*label).to_string(),
            })
            .collect(),
    }
}

/// Same tree as `fixtures/catalog.json`.
pub(crate) fn sample_taxonomy() -> Taxonomy {
    Taxonomy::new(vec![
        Category {
            id: "c-bags".into(),
            name: "Bags".to_string(),
            slug: "bags".to_string(),
            subcategories: vec![subcategory(
                "s-material",
                "c-bags",
                "material",
                &[("a-leather", "Leather")],
            )],
        },
        Category {
            id: "c-watches".into(),
            name: "Watches".to_string(),
            slug: "watches".to_string(),
            subcategories: vec![
                subcategory(
                    "s-brand",
                    "c-watches",
                    "brand",
                    &[("a-omega", "Omega"), ("a-rolex", "Rolex")],
                ),
                subcategory(
                    "s-movement",
                    "c-watches",
                    "movement",
                    &[("a-automatic", "Automatic"), ("a-quartz", "Quartz")],
                ),
            ],
        },
    ])
}
