use lcexport::geometric::land_cover::CategoryDictionary;
use lcexport::geometric::legend::build_legend;
use lcexport::geometric::map_display::VisParams;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module with panic hook
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(e: lcexport::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse `{"names": [...], "colors": [...]}`; an empty string means the ESRI 2020 table
fn parse_categories(categories_json: &str) -> lcexport::Result<CategoryDictionary> {
    if categories_json.trim().is_empty() {
        return Ok(CategoryDictionary::esri_lulc_2020());
    }
    serde_json::from_str(categories_json)
        .map_err(|e| lcexport::Error::Configuration(format!("invalid categories: {}", e)))
}

fn render_legend(title: &str, categories_json: &str) -> lcexport::Result<String> {
    let dict = parse_categories(categories_json)?;
    Ok(build_legend(title, &dict).to_html())
}

fn render_palette(categories_json: &str) -> lcexport::Result<String> {
    let dict = parse_categories(categories_json)?;
    Ok(VisParams::for_categories(&dict)?.palette_string())
}

/// Legend panel as an HTML fragment
///
/// # Errors
/// Returns a JsValue error when the name and color lists differ in length or a
/// color is not `#RRGGBB`.
#[wasm_bindgen]
pub fn legend_html(title: &str, categories_json: &str) -> Result<String, JsValue> {
    render_legend(title, categories_json).map_err(to_js)
}

/// Comma separated palette for a tile layer, one color per class code
#[wasm_bindgen]
pub fn legend_palette(categories_json: &str) -> Result<String, JsValue> {
    render_palette(categories_json).map_err(to_js)
}

/// Legend widgets as a JS object, for map libraries that build their own DOM
#[wasm_bindgen]
pub fn legend_widgets(title: &str, categories_json: &str) -> Result<JsValue, JsValue> {
    let dict = parse_categories(categories_json).map_err(to_js)?;
    let legend = build_legend(title, &dict);
    serde_wasm_bindgen::to_value(legend.panel()).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Append the legend to the map container with id `container_id`
///
/// The container should be positioned (e.g. `position: relative`) so the
/// bottom-left anchor lands on the map.
#[wasm_bindgen]
pub fn attach_legend(container_id: &str, title: &str, categories_json: &str) -> Result<(), JsValue> {
    let html = render_legend(title, categories_json).map_err(to_js)?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))?;
    let container = document
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id {:?}", container_id)))?;

    container.insert_adjacent_html("beforeend", &html)?;
    web_sys::console::log_1(&JsValue::from_str(&format!(
        "legend {:?} attached to #{}",
        title, container_id
    )));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories() {
        let html = render_legend("ESRI 2020 Land Cover", "").unwrap();
        assert!(html.contains("ESRI 2020 Land Cover"));
        assert!(html.contains("Flooded Vegetation"));
        assert_eq!(html.matches("background-color").count(), 10);
    }

    #[test]
    fn test_custom_categories() {
        let html = render_legend(
            "Land Cover",
            r##"{"names": ["Water", "Trees"], "colors": ["#1A5BAB", "#358221"]}"##,
        )
        .unwrap();
        let water = html.find("Water").unwrap();
        let trees = html.find("Trees").unwrap();
        assert!(water < trees);
        assert!(html.contains("background-color: #1A5BAB"));
    }

    #[test]
    fn test_mismatched_categories() {
        let err = render_legend("t", r##"{"names": ["Water"], "colors": []}"##).unwrap_err();
        assert!(matches!(err, lcexport::Error::Configuration(_)));
    }

    #[test]
    fn test_palette() {
        assert_eq!(
            render_palette(r##"{"names": ["Water", "Trees"], "colors": ["#1A5BAB", "#358221"]}"##)
                .unwrap(),
            "1A5BAB,358221"
        );
    }
}
