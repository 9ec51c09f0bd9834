use mieszkanie_scout::config::{SiteConfig, SiteRegistry};
use mieszkanie_scout::extract::find_listings;
use mieszkanie_scout::{property_id, Extractor};
use scraper::Html;

fn site(name: &str) -> SiteConfig {
    let path = format!("{}/sites/{}.json", env!("CARGO_MANIFEST_DIR"), name);
    SiteConfig::from_file(path).unwrap()
}

const LABELED: &str = r#"{
    "site_name": "demo",
    "base_domain": "https://site.pl",
    "selectors": {
        "listings_container": {"tag": "section", "class": "offers"},
        "listing_item": {"node": {"tag": "div", "class": "offer"}},
        "link": {"candidates": [{"kind": "attribute", "node": {"tag": "a", "class": "title"}, "attribute": "href"}]},
        "title": {"candidates": [{"kind": "text", "node": {"tag": "a", "class": "title"}}]},
        "address": {"candidates": [{"kind": "text", "node": {"tag": "p", "class": "location"}}]},
        "price": {"candidates": [
            {"kind": "text", "node": {"tag": "strong", "class": "price"}},
            {"kind": "text_containing", "tag": "span", "needle": "zł"}
        ]},
        "details": {
            "strategy": "labeled_pair",
            "labels": {"tag": "dt"},
            "values": {"tag": "dd"}
        }
    }
}"#;

const TWO_OFFERS: &str = r#"<html><body><section class="offers">
    <div class="offer">
        <a class="title" href="/oferta/1">Mieszkanie 3 pokoje</a>
        <p class="location">Katowice, Brynów</p>
        <strong class="price">520 000 zł</strong>
        <dl>
            <dt>Powierzchnia</dt><dd>62,4 m²</dd>
            <dt>Liczba pokoi</dt><dd>3</dd>
            <dt>Piętro</dt><dd>parter</dd>
        </dl>
    </div>
    <div class="offer">
        <a class="title" href="/oferta/2">Kawalerka przy parku</a>
        <p class="location">Katowice, Ligota</p>
        <strong class="price">289 000 zł</strong>
        <dl>
            <dt>Liczba pokoi</dt><dd>1</dd>
            <dt>Piętro</dt><dd>4/10</dd>
        </dl>
    </div>
</section></body></html>"#;

#[test]
fn test_missing_area_keeps_record() {
    let config = SiteConfig::from_json(LABELED).unwrap();
    let properties = Extractor::new(&config).extract_page(TWO_OFFERS, "katowice");

    assert_eq!(properties.len(), 2);

    let first = &properties[0];
    assert_eq!(first.link, "https://site.pl/oferta/1");
    assert_eq!(first.area, 62);
    assert_eq!(first.rooms, Some(3));
    assert_eq!(first.level, Some(0));

    let second = &properties[1];
    assert_eq!(second.area, 0);
    assert_eq!(second.title, "Kawalerka przy parku");
    assert_eq!(second.link, "https://site.pl/oferta/2");
    assert_eq!(second.id, property_id("https://site.pl/oferta/2"));
    assert_eq!(second.price, 289000);
    assert_eq!(second.rooms, Some(1));
    assert_eq!(second.level, Some(4));
    assert_eq!(second.address, "Katowice, Ligota");
    assert_eq!(second.city, "Katowice");
    assert_eq!(second.site, "demo");
}

#[test]
fn test_missing_price_defaults_to_zero() {
    let config = SiteConfig::from_json(LABELED).unwrap();
    let html = r#"<section class="offers"><div class="offer">
        <a class="title" href="/oferta/9">Mieszkanie do remontu</a>
        <p class="location">Gliwice, Sośnica</p>
        <dl><dt>Powierzchnia</dt><dd>38 m²</dd></dl>
    </div></section>"#;

    let properties = Extractor::new(&config).extract_page(html, "gliwice");
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].price, 0);
    assert_eq!(properties[0].area, 38);
    assert_eq!(properties[0].address, "Gliwice, Sośnica");
}

#[test]
fn test_price_found_by_later_candidate() {
    let config = SiteConfig::from_json(LABELED).unwrap();
    let html = r#"<section class="offers"><div class="offer">
        <a class="title" href="/oferta/5">Mieszkanie</a>
        <span>do negocjacji</span>
        <span>415 000 zł</span>
    </div></section>"#;

    let properties = Extractor::new(&config).extract_page(html, "katowice");
    assert_eq!(properties[0].price, 415000);
}

#[test]
fn test_malformed_candidate_falls_through_to_next() {
    let json = LABELED.replace(
        r#""price": {"candidates": ["#,
        r#""price": {"candidates": [
            {"kind": "attribute", "node": {"tag": "strong"}},"#,
    );
    let config = SiteConfig::from_json(&json).unwrap();
    let properties = Extractor::new(&config).extract_page(TWO_OFFERS, "katowice");

    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].price, 520000);
    assert_eq!(properties[1].price, 289000);
    assert_eq!(properties[0].area, 62);
}

#[test]
fn test_missing_link_drops_record() {
    let config = SiteConfig::from_json(LABELED).unwrap();
    let html = r#"<section class="offers">
        <div class="offer"><span class="title">Bez odnośnika</span><strong class="price">1 zł</strong></div>
        <div class="offer"><a class="title" href="https://site.pl/oferta/3">Z odnośnikiem</a></div>
    </section>"#;

    let properties = Extractor::new(&config).extract_page(html, "katowice");
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].title, "Z odnośnikiem");
    assert_eq!(properties[0].link, "https://site.pl/oferta/3");
}

#[test]
fn test_attribute_tagged_listings_ignore_class_noise() {
    let config = site("olx");
    let document = Html::parse_document(
        r#"<div data-testid="listing-grid">
            <div class="css-1sw7q4x" data-cy="l-card" id="a">A</div>
            <div class="css-1sw7q4x">baner</div>
            <div><div class="inny" data-cy="l-card" id="b">B</div></div>
            <div data-cy="other" class="css-1sw7q4x">C</div>
        </div>"#,
    );
    let container = mieszkanie_scout::extract::find_container(&document, &config.selectors).unwrap();
    let ids: Vec<_> = find_listings(container, &config.selectors.listing_item)
        .iter()
        .filter_map(|el| el.value().attr("id"))
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_shipped_sites_load() {
    let registry = SiteRegistry::load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/sites")).unwrap();
    assert_eq!(
        registry.names(),
        vec!["allegro", "gethome", "nieruchomosci", "olx", "otodom"]
    );
}

#[test]
fn test_olx_listing() {
    let config = site("olx");
    let html = r#"<html><body><div data-testid="listing-grid">
        <div data-cy="l-card">
            <a class="css-1tqlkj0" href="/d/oferta/mieszkanie-ligota-CID3-ID1.html">
                <img src="https://ireland.apollo.olxcdn.com/v1/files/abc/image;s=216x152"
                     srcset="https://ireland.apollo.olxcdn.com/v1/files/abc/image;s=216x152 216w, https://ireland.apollo.olxcdn.com/v1/files/abc/image;s=644x461 644w">
            </a>
            <h4>Mieszkanie 2 pokoje Ligota</h4>
            <p data-testid="ad-price">359 000 zł</p>
            <p data-testid="location-date">Katowice, Ligota - Dzisiaj o 12:30</p>
            <span class="css-6as4g5">44 m²</span>
        </div>
        <div data-cy="l-card">
            <a class="css-1tqlkj0" href="/d/oferta/kawalerka-ID2.html">
                <img src="/app/static/media/no_thumbnail.15f456ec5.svg">
            </a>
            <h4>Kawalerka</h4>
            <p data-testid="ad-price">199 000 zł</p>
            <p data-testid="location-date">Katowice, Śródmieście - 12 marca 2025</p>
            <div data-testid="blueprint-card-param-icon"><span>27 m²</span></div>
        </div>
    </div></body></html>"#;

    let properties = Extractor::new(&config).extract_page(html, "katowice");
    assert_eq!(properties.len(), 2);

    assert_eq!(properties[0].link, "https://www.olx.pl/d/oferta/mieszkanie-ligota-CID3-ID1.html");
    assert_eq!(
        properties[0].image,
        "https://ireland.apollo.olxcdn.com/v1/files/abc/image;s=644x461"
    );
    assert_eq!(properties[0].price, 359000);
    assert_eq!(properties[0].area, 44);
    assert_eq!(properties[0].address, "Katowice, Ligota");
    assert_eq!(properties[0].rooms, None);

    assert_eq!(properties[1].image, "");
    assert_eq!(properties[1].area, 27);
    assert_eq!(properties[1].address, "Katowice, Śródmieście");
}

#[test]
fn test_allegro_listing() {
    let config = site("allegro");
    let html = r#"<html><body><div data-role="rightItems">
        <article class="mx7m_1 mnyp_co">
            <h2><a href="https://allegro.pl/ogloszenie/mieszkanie-1">Mieszkanie, Katowice, Koszutka, 51 m²</a></h2>
            <img src="https://a.allegroimg.com/s180/11/mieszkanie.jpg">
            <span aria-label="cena 450 000,00 zł">450 000,00 zł</span>
            <span class="mgmw_3z _1e32a_XFNn4">Powierzchnia w m²</span><span class="mgmw_3z _1e32a_uVIcE">51,20</span>
            <span class="mgmw_3z _1e32a_XFNn4">Liczba pokoi</span><span class="mgmw_3z _1e32a_uVIcE">2</span>
            <span class="mgmw_3z _1e32a_XFNn4">Piętro</span><span class="mgmw_3z _1e32a_uVIcE">3</span>
        </article>
    </div></body></html>"#;

    let properties = Extractor::new(&config).extract_page(html, "katowice");
    assert_eq!(properties.len(), 1);

    let property = &properties[0];
    assert_eq!(property.title, "Mieszkanie, Katowice, Koszutka, 51 m²");
    assert_eq!(property.address, "Katowice, Koszutka");
    assert_eq!(property.image, "https://a.allegroimg.com/s720/11/mieszkanie.jpg");
    assert_eq!(property.price, 450000);
    assert_eq!(property.area, 51);
    assert_eq!(property.rooms, Some(2));
    assert_eq!(property.level, Some(3));
}

#[test]
fn test_gethome_listing() {
    let config = site("gethome");
    let html = r#"<html><body><ul class="o1dwdgv">
        <li>
            <a class="o13k6g1y" href="/oferta/mieszkanie-katowice-1">
                <picture><img src="https://img.gethome.pl/1.jpg"></picture>
                <h3 class="o1n3pqhf">Mieszkanie z balkonem</h3>
            </a>
            <address>Katowice, Załęże</address>
            <div class="v1c2i1u9">410 000 zł</div>
            <span class="ngl9ymk" data-testid="rooms">3</span>
            <span class="ngl9ymk">piętro</span>
            <span class="ngl9ymk">58 m²</span>
        </li>
    </ul>
    <nav><a data-page="1">1</a><a data-page="2">2</a><a data-page="14">14</a></nav>
    </body></html>"#;

    let extractor = Extractor::new(&config);
    let properties = extractor.extract_page(html, "katowice");
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].link, "https://gethome.pl/oferta/mieszkanie-katowice-1");
    assert_eq!(properties[0].image, "https://img.gethome.pl/1.jpg");
    assert_eq!(properties[0].rooms, Some(3));
    assert_eq!(properties[0].area, 58);
    assert_eq!(properties[0].price, 410000);
    assert_eq!(extractor.page_count(html), 14);
}

#[test]
fn test_nieruchomosci_listing() {
    let config = site("nieruchomosci");
    let html = r#"<html><body><div class="column-container column_default">
        <div class="tile tile-tile">
            <h2 class="name"><a href="https://katowice.nieruchomosci-online.pl/mieszkanie,z-ogrodem/25212.html">Mieszkanie z ogrodem</a></h2>
            <picture><source srcset="https://i.st-nieruchomosci-online.pl/abc/m/25212.jpg"></picture>
            <p class="province">Katowice,   Piotrowice </p>
            <p class="primary-display">635 000 zł</p>
            <p class="title-b"><span>mieszkanie</span><span>72,10 m²</span></p>
            <p>Liczba pokoi: <strong>4</strong></p>
            <p>Piętro: <strong>parter</strong></p>
        </div>
    </div></body></html>"#;

    let extractor = Extractor::new(&config);
    let properties = extractor.extract_page(html, "katowice");
    assert_eq!(properties.len(), 1);

    let property = &properties[0];
    assert_eq!(property.image, "https://i.st-nieruchomosci-online.pl/abc/l/25212.jpg");
    assert_eq!(property.address, "Katowice, Piotrowice");
    assert_eq!(property.price, 635000);
    assert_eq!(property.area, 72);
    assert_eq!(property.rooms, Some(4));
    assert_eq!(property.level, Some(0));
    assert_eq!(extractor.page_count(html), 50);
}
