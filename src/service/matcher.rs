use crate::models::CatalogProduct;

/// 候选商品最多返回数量
pub const MAX_SUGGESTIONS: usize = 5;

const EXACT_SCORE: i64 = 100;
const CONTAINS_SCORE: i64 = 50;
const TOKEN_SCORE: i64 = 10;
const PREFIX_SCORE: i64 = 5;

/// 按空白、连字符、下划线切分 (小写)
pub fn tokenize(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// 计算单个商品得分, 两个参数均已小写
pub fn score(scanned: &str, tokens: &[String], product_name: &str) -> i64 {
    // 空名称包含于任何字符串, 不参与评分
    if product_name.is_empty() {
        return 0;
    }
    let mut score = 0;

    if product_name == scanned {
        score += EXACT_SCORE;
    }
    // 双向包含各自独立计分
    if product_name.contains(scanned) {
        score += CONTAINS_SCORE;
    }
    if scanned.contains(product_name) {
        score += CONTAINS_SCORE;
    }

    for token in tokens {
        if token.chars().count() > 2 && product_name.contains(token.as_str()) {
            score += TOKEN_SCORE;
        }
    }

    let prefix: String = scanned.chars().take(3).collect();
    if product_name.starts_with(&prefix) {
        score += PREFIX_SCORE;
    }

    score
}

/// 模糊候选: 得分 > 0, 按得分降序 (同分保持目录顺序), 最多 5 个
pub fn find_candidates(scanned_name: &str, catalog: &[CatalogProduct]) -> Vec<CatalogProduct> {
    let scanned = scanned_name.trim().to_lowercase();
    if scanned.is_empty() {
        return Vec::new();
    }
    let tokens = tokenize(&scanned);

    let mut scored: Vec<(i64, &CatalogProduct)> = catalog
        .iter()
        .map(|p| (score(&scanned, &tokens, &p.name.to_lowercase()), p))
        .filter(|(s, _)| *s > 0)
        .collect();

    // sort_by 是稳定排序
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, p)| p.clone())
        .collect()
}

/// 名称完全相同 (忽略大小写)
pub fn find_exact<'a>(scanned_name: &str, catalog: &'a [CatalogProduct]) -> Option<&'a CatalogProduct> {
    let scanned = scanned_name.trim().to_lowercase();
    if scanned.is_empty() {
        return None;
    }
    catalog.iter().find(|p| p.name.to_lowercase() == scanned)
}

/// 任一方向包含 (忽略大小写), 目录中第一个命中者
pub fn find_containing<'a>(
    scanned_name: &str,
    catalog: &'a [CatalogProduct],
) -> Option<&'a CatalogProduct> {
    let scanned = scanned_name.trim().to_lowercase();
    if scanned.is_empty() {
        return None;
    }
    catalog.iter().find(|p| {
        let name = p.name.to_lowercase();
        !name.is_empty() && (name.contains(&scanned) || scanned.contains(&name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;
    use bigdecimal::BigDecimal;

    fn catalog(names: &[&str]) -> Vec<CatalogProduct> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| CatalogProduct {
                id: i as i64 + 1,
                name: name.to_string(),
                unit: Unit::Piece,
                active: true,
                stock_quantity: BigDecimal::from(0),
            })
            .collect()
    }

    #[test]
    fn tokenize_splits_on_separator_runs() {
        assert_eq!(tokenize("Rode  Appel-Elstar__bio"), vec!["rode", "appel", "elstar", "bio"]);
        assert!(tokenize("  - _ ").is_empty());
    }

    #[test]
    fn exact_match_scores_all_bonuses() {
        let tokens = tokenize("appel");
        // 100 exact + 50 + 50 containment + 10 token + 5 prefix
        assert_eq!(score("appel", &tokens, "appel"), 215);
    }

    #[test]
    fn short_tokens_do_not_score() {
        let tokens = tokenize("ei xl");
        assert_eq!(score("ei xl", &tokens, "scharrel ei"), 0);
    }

    #[test]
    fn candidates_are_sorted_and_capped() {
        let products = catalog(&[
            "Tomaat",
            "Cherry Tomaat",
            "Tomaat Tros",
            "Tomatensoep",
            "Trostomaat",
            "Tomaat Roma",
            "Komkommer",
        ]);
        let found = find_candidates("tomaat", &products);
        assert_eq!(found.len(), MAX_SUGGESTIONS);
        assert_eq!(found[0].name, "Tomaat");
        assert!(found.iter().all(|p| p.name != "Komkommer"));
    }

    #[test]
    fn equal_scores_keep_catalog_order() {
        let products = catalog(&["Prei Groot", "Prei Klein"]);
        let found = find_candidates("prei", &products);
        assert_eq!(found[0].name, "Prei Groot");
        assert_eq!(found[1].name, "Prei Klein");
    }

    #[test]
    fn unrelated_name_yields_nothing() {
        let products = catalog(&["Aardappel", "Ui"]);
        assert!(find_candidates("zzz", &products).is_empty());
        assert!(find_candidates("   ", &products).is_empty());
    }

    #[test]
    fn token_hits_surface_partial_names() {
        let products = catalog(&["Elstar Appel", "Peer Conference"]);
        let found = find_candidates("appels elstar rood", &products);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Elstar Appel");
    }

    #[test]
    fn blank_catalog_names_are_never_suggested() {
        let products = catalog(&["", "Prei"]);
        assert_eq!(score("prei", &tokenize("prei"), ""), 0);
        let found = find_candidates("prei", &products);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Prei");
        assert!(find_candidates("spinazie", &products).is_empty());
    }

    #[test]
    fn exact_and_containing_lookups() {
        let products = catalog(&["Bio Bananen", "Appel"]);
        assert_eq!(find_exact("APPEL", &products).map(|p| p.id), Some(2));
        assert_eq!(find_containing("bananen", &products).map(|p| p.id), Some(1));
        assert_eq!(find_containing("Bio Bananen 1kg", &products).map(|p| p.id), Some(1));
        assert!(find_exact("", &products).is_none());
    }
}
