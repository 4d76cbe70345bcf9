use pretty_assertions::assert_eq;
use shopfront_filter::AddressConfig;
use shopfront_filter::FilterAction;
use shopfront_filter::FilterController;
use shopfront_filter::FilterState;
use shopfront_filter::Navigation;
use shopfront_filter::SortOption;
use shopfront_filter::decode;
use shopfront_filter::encode;
use shopfront_store::MemoryBackend;
use shopfront_taxonomy::Taxonomy;
use shopfront_taxonomy::TaxonomyStore;
use std::sync::Arc;

async fn fixture_taxonomy() -> Arc<Taxonomy> {
    let fixture: serde_json::Value =
        serde_json::from_str(include_str!("../../fixtures/catalog.json")).unwrap();
    let backend = Arc::new(MemoryBackend::from_fixture(fixture).unwrap());
    TaxonomyStore::new(backend).load().await.unwrap()
}

fn assert_selection_is_a_path(state: &FilterState, taxonomy: &Taxonomy) {
    for subcategory in state.subcategories() {
        assert_eq!(taxonomy.category_of(subcategory), state.category());
    }
    for attribute in state.attributes() {
        let owner = taxonomy.subcategory_of(attribute).unwrap();
        assert!(state.subcategories().contains(owner));
    }
}

#[tokio::test]
async fn every_step_keeps_the_invariant_and_round_trips() {
    let taxonomy = fixture_taxonomy().await;
    let config = AddressConfig::default();
    let actions = vec![
        FilterAction::SelectCategory(Some("c-watches".into())),
        FilterAction::ToggleSubcategory("s-brand".into()),
        FilterAction::ToggleAttribute("a-rolex".into()),
        FilterAction::ToggleSubcategory("s-movement".into()),
        FilterAction::ToggleAttribute("a-automatic".into()),
        FilterAction::ToggleAttribute("a-leather".into()),
        FilterAction::SetSort(SortOption::PriceAsc),
        FilterAction::SetPage(4),
        FilterAction::ToggleSubcategory("s-brand".into()),
        FilterAction::SetSearchText("chrono".to_string()),
        FilterAction::SelectCategory(Some("c-bags".into())),
        FilterAction::ToggleSubcategory("s-material".into()),
        FilterAction::SelectCategory(None),
        FilterAction::Reset,
    ];

    let mut state = FilterState::default();
    for action in actions {
        state = state.apply(action, &taxonomy);
        assert_selection_is_a_path(&state, &taxonomy);

        let address = encode(&state, &taxonomy, &config);
        let decoded = decode(address.as_str(), &taxonomy, &config);
        assert_eq!(decoded, state, "address {address}");
        assert_eq!(encode(&decoded, &taxonomy, &config), address);
    }
}

#[tokio::test]
async fn search_on_page_three_starts_over_at_page_one() {
    let taxonomy = fixture_taxonomy().await;
    let mut controller =
        FilterController::with_address(taxonomy, AddressConfig::default(), "/store/watches?page=3");
    assert_eq!(controller.state().page(), 3);
    let mut rx = controller.subscribe();

    let navigation = controller.set_search_text("chrono");
    assert!(matches!(navigation, Some(Navigation::Replace(_))));
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.state.page(), 1);
    assert_eq!(snapshot.state.search_text(), "chrono");
    assert_eq!(
        controller.address().as_str(),
        "/store/watches?q=chrono"
    );
}

#[tokio::test]
async fn switching_category_clears_selection_through_the_controller() {
    let taxonomy = fixture_taxonomy().await;
    let mut controller = FilterController::with_address(
        taxonomy,
        AddressConfig::default(),
        "/store/watches?subcategories=s-brand,s-movement&attributes=a-rolex,a-quartz",
    );
    assert!(controller.is_subcategory_selected(&"s-movement".into()));
    assert!(controller.is_attribute_selected(&"a-quartz".into()));

    controller.toggle_subcategory("s-movement".into());
    assert!(controller.is_attribute_selected(&"a-rolex".into()));
    assert!(!controller.is_attribute_selected(&"a-quartz".into()));

    let navigation = controller.select_category(Some("c-bags".into()));
    assert_eq!(
        navigation.map(|navigation| navigation.address().to_string()),
        Some("/store/bags".to_string())
    );
    assert!(controller.state().subcategories().is_empty());
    assert!(controller.state().attributes().is_empty());
}
