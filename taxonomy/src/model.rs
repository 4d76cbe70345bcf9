use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Store identity of a [`Category`].
    CategoryId
);
opaque_id!(
    /// Store identity of a [`Subcategory`].
    SubcategoryId
);
opaque_id!(
    /// Store identity of an [`Attribute`].
    AttributeId
);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Human-readable alias used in addresses; unique across categories.
    pub slug: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
    /// User-chosen discriminator, unique within the owning category.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub subcategory_id: SubcategoryId,
    pub label: String,
}

impl Subcategory {
    pub fn has_attribute(&self, id: &AttributeId) -> bool {
        self.attributes.iter().any(|attribute| &attribute.id == id)
    }
}

impl Category {
    pub fn has_subcategory(&self, id: &SubcategoryId) -> bool {
        self.subcategories
            .iter()
            .any(|subcategory| &subcategory.id == id)
    }
}

/// The complete category → subcategory → attribute tree with owner indexes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Taxonomy {
    categories: Vec<Category>,
    #[serde(skip)]
    subcategory_index: HashMap<SubcategoryId, (usize, usize)>,
    #[serde(skip)]
    attribute_index: HashMap<AttributeId, (usize, usize, usize)>,
}

impl Taxonomy {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut subcategory_index = HashMap::new();
        let mut attribute_index = HashMap::new();
        for (ci, category) in categories.iter().enumerate() {
            for (si, subcategory) in category.subcategories.iter().enumerate() {
                subcategory_index.insert(subcategory.id.clone(), (ci, si));
                for (ai, attribute) in subcategory.attributes.iter().enumerate() {
                    attribute_index.insert(attribute.id.clone(), (ci, si, ai));
                }
            }
        }
        Self {
            categories,
            subcategory_index,
            attribute_index,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    /// Exact, case-sensitive slug lookup.
    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.slug == slug)
    }

    pub fn subcategory(&self, id: &SubcategoryId) -> Option<&Subcategory> {
        let (ci, si) = *self.subcategory_index.get(id)?;
        self.categories.get(ci)?.subcategories.get(si)
    }

    pub fn attribute(&self, id: &AttributeId) -> Option<&Attribute> {
        let (ci, si, ai) = *self.attribute_index.get(id)?;
        self.categories
            .get(ci)?
            .subcategories
            .get(si)?
            .attributes
            .get(ai)
    }

    /// Category owning a subcategory.
    pub fn category_of(&self, id: &SubcategoryId) -> Option<&CategoryId> {
        self.subcategory(id).map(|subcategory| &subcategory.category_id)
    }

    /// Subcategory owning an attribute.
    pub fn subcategory_of(&self, id: &AttributeId) -> Option<&SubcategoryId> {
        self.attribute(id).map(|attribute| &attribute.subcategory_id)
    }

    pub fn subcategory_count(&self) -> usize {
        self.subcategory_index.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attribute_index.len()
    }
}
