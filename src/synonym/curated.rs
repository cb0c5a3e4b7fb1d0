//! Built-in curated synonym tables.
//!
//! Canonicals are stored in normalized form. Variants may carry any case or
//! spacing; they are normalized when the map is built.

use crate::domain::Domain;

pub(super) const VERSION: &str = "curated-2024.1";

pub(super) const ENTRIES: &[(Domain, &str, &str)] = &[
    // targets
    (Domain::Target, "ltcc", "l-type calcium channel"),
    (Domain::Target, "l-vscc", "l-type calcium channel"),
    (Domain::Target, "кальциевый канал l-типа", "l-type calcium channel"),
    (Domain::Target, "сердечный кальциевый канал", "l-type calcium channel"),
    (Domain::Target, "cox1", "cox1"),
    (Domain::Target, "cox2", "cox2"),
    (Domain::Target, "cox3", "cox3"),
    (Domain::Target, "sert", "sert"),
    (Domain::Target, "at1-рецептор", "at1 receptor"),
    (Domain::Target, "na-k-2cl котранспортер", "na-k-2cl cotransporter"),
    (Domain::Target, "na-cl котранспортер", "na-cl cotransporter"),
    (Domain::Target, "h+/k+-атфаза", "h+/k+-atpase"),
    // effects
    (Domain::Effect, "гипотензия", "низкое давление"),
    (Domain::Effect, "ортостатическая гипотензия", "низкое давление"),
    (Domain::Effect, "low blood pressure", "низкое давление"),
    (Domain::Effect, "гипонатриемия", "низкий натрий"),
    (Domain::Effect, "низкий уровень натрия", "низкий натрий"),
    (Domain::Effect, "жк-кровотечение", "желудочно-кишечное кровотечение"),
    (Domain::Effect, "ulcer", "желудочно-кишечное кровотечение"),
    (Domain::Effect, "серотониновый синдром", "серотониновый синдром"),
    // roles
    (Domain::Role, "ингибитор", "ингибитор"),
    (Domain::Role, "замедление", "ингибитор"),
    (Domain::Role, "снижение", "ингибитор"),
    (Domain::Role, "inhibitor", "ингибитор"),
    (Domain::Role, "индуктор", "индуктор"),
    (Domain::Role, "активатор", "индуктор"),
    (Domain::Role, "стимулятор", "индуктор"),
    (Domain::Role, "inducer", "индуктор"),
    (Domain::Role, "activator", "индуктор"),
    (Domain::Role, "субстрат", "субстрат"),
    (Domain::Role, "substrate", "субстрат"),
    (Domain::Role, "блокатор", "блокатор"),
    (Domain::Role, "антагонист", "блокатор"),
    (Domain::Role, "blocker", "блокатор"),
    (Domain::Role, "antagonist", "блокатор"),
    (Domain::Role, "агонист", "агонист"),
    (Domain::Role, "миметик", "агонист"),
    (Domain::Role, "agonist", "агонист"),
    // curator additions: hyphenated, English and plural spellings seen in
    // imported data
    (Domain::Target, "cox-1", "cox1"),
    (Domain::Target, "cox-2", "cox2"),
    (Domain::Effect, "hypotension", "низкое давление"),
    (Domain::Effect, "hyponatremia", "низкий натрий"),
    (Domain::Effect, "gi bleeding", "желудочно-кишечное кровотечение"),
    (Domain::Effect, "serotonin syndrome", "серотониновый синдром"),
    (Domain::Role, "ингибиторы", "ингибитор"),
    (Domain::Role, "inhibitors", "ингибитор"),
    (Domain::Role, "индукторы", "индуктор"),
    (Domain::Role, "субстраты", "субстрат"),
    (Domain::Role, "блокаторы", "блокатор"),
    (Domain::Role, "агонисты", "агонист"),
];
