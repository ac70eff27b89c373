//! In-page probe scripts.
//!
//! Each strategy runs one script that collects candidate elements and maps
//! them to [`crate::CandidateMetrics`] objects. All DOM inspection happens
//! in the page; scoring stays on the Rust side so it is deterministic and
//! unit-testable.

use action_dsl::{Selector, Strategy};

/// Candidates collected per strategy before scoring.
pub const CANDIDATE_LIMIT: usize = 6;

const HELPERS: &str = r#"
const cssPath = (el) => {
    const parts = [];
    let node = el;
    while (node && node.nodeType === Node.ELEMENT_NODE && node.tagName !== "HTML") {
        const tag = node.tagName.toLowerCase();
        let nth = 1;
        let sibling = node;
        while ((sibling = sibling.previousElementSibling)) {
            if (sibling.tagName === node.tagName) nth += 1;
        }
        parts.unshift(tag + ":nth-of-type(" + nth + ")");
        node = node.parentElement;
    }
    return parts.join(" > ");
};
const styleHidden = (el) => {
    const style = window.getComputedStyle(el);
    return style.display === "none" || style.visibility === "hidden";
};
const isVisible = (el) => {
    if (styleHidden(el)) return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
};
const roleOf = (el) => {
    const explicit = el.getAttribute("role");
    if (explicit) return explicit;
    const tag = el.tagName.toLowerCase();
    if (tag === "a" && el.hasAttribute("href")) return "link";
    if (tag === "button" || tag === "summary") return "button";
    if (tag === "select") return "combobox";
    if (tag === "textarea") return "textbox";
    if (tag === "input") {
        const type = (el.getAttribute("type") || "text").toLowerCase();
        if (type === "checkbox") return "checkbox";
        if (type === "radio") return "radio";
        if (type === "range") return "slider";
        if (type === "search") return "searchbox";
        if (type === "button" || type === "submit" || type === "reset") return "button";
        return "textbox";
    }
    return "";
};
const isClickable = (el) => {
    const tag = el.tagName.toLowerCase();
    if (["a", "button", "input", "select", "textarea"].includes(tag)) return true;
    const role = roleOf(el);
    if (role === "button" || role === "link") return true;
    const tabindex = el.getAttribute("tabindex");
    if (tabindex !== null && parseInt(tabindex, 10) >= 0) return true;
    return el.isContentEditable === true;
};
const inViewport = (el) => {
    const rect = el.getBoundingClientRect();
    return rect.bottom > 0 && rect.right > 0 &&
        rect.top < window.innerHeight && rect.left < window.innerWidth;
};
const INTERACTIVE_ROLES = ["button", "link", "textbox", "checkbox", "radio",
    "menuitem", "tab", "switch", "combobox", "slider", "spinbutton", "searchbox"];
const isInteractive = (el) => {
    if (styleHidden(el)) return false;
    const tag = el.tagName.toLowerCase();
    if (["a", "button", "select", "textarea", "summary", "option"].includes(tag)) return true;
    if (tag === "input") return (el.getAttribute("type") || "").toLowerCase() !== "hidden";
    if (INTERACTIVE_ROLES.includes(el.getAttribute("role") || "")) return true;
    if (el.hasAttribute("onclick")) return true;
    const tabindex = el.getAttribute("tabindex");
    if (tabindex !== null && parseInt(tabindex, 10) >= 0) return true;
    return el.getAttribute("contenteditable") === "true";
};
const interactables = () =>
    Array.from(document.querySelectorAll("*")).filter(isInteractive);
const metricOf = (el, ordinal) => {
    const rect = el.getBoundingClientRect();
    return {
        dom_path: cssPath(el),
        visible: isVisible(el),
        clickable: isClickable(el),
        in_viewport: inViewport(el),
        text: ((el.innerText || el.value || "") + "").trim().slice(0, 160),
        aria_label: el.getAttribute("aria-label") || "",
        role: roleOf(el),
        bbox: [rect.x, rect.y, rect.width, rect.height],
        ordinal: ordinal,
    };
};
const anchorCenter = (needle) => {
    if (!needle) return null;
    const lowered = needle.toLowerCase();
    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
    while (walker.nextNode()) {
        const value = walker.currentNode.textContent || "";
        if (value.toLowerCase().includes(lowered)) {
            const parent = walker.currentNode.parentElement;
            if (!parent) continue;
            const rect = parent.getBoundingClientRect();
            return [rect.x + rect.width / 2, rect.y + rect.height / 2];
        }
    }
    return null;
};
"#;

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Build the probe for one strategy, or `None` when the selector lacks the
/// field the strategy needs.
pub fn probe_script(strategy: Strategy, selector: &Selector) -> Option<String> {
    let collect = match strategy {
        Strategy::Css => {
            let css = quote(selector.css.as_deref()?);
            format!("els = Array.from(document.querySelectorAll({css}));")
        }
        Strategy::Xpath => {
            let xpath = quote(selector.xpath.as_deref()?);
            format!(
                r#"const snapshot = document.evaluate({xpath}, document, null,
                    XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                for (let i = 0; i < snapshot.snapshotLength; i++) {{
                    const node = snapshot.snapshotItem(i);
                    if (node && node.nodeType === Node.ELEMENT_NODE) els.push(node);
                }}"#
            )
        }
        Strategy::Text => {
            let text = quote(selector.text.as_deref()?);
            format!(
                r#"const needle = {text}.toLowerCase();
                const matches = Array.from(document.body.querySelectorAll("*")).filter((el) =>
                    ((el.innerText || "") + "").toLowerCase().includes(needle));
                // Keep the deepest matches only.
                els = matches.filter((el) => !matches.some((other) => other !== el && el.contains(other)));"#
            )
        }
        Strategy::Role => {
            let role = quote(selector.role.as_deref()?);
            format!("els = interactables().filter((el) => roleOf(el) === {role});")
        }
        Strategy::AriaLabel => {
            let aria = quote(selector.aria_label.as_deref()?);
            format!(
                r#"const needle = {aria}.toLowerCase();
                els = Array.from(document.querySelectorAll("[aria-label]")).filter((el) =>
                    (el.getAttribute("aria-label") || "").toLowerCase().includes(needle));"#
            )
        }
        Strategy::NearText => {
            let near = quote(selector.near_text.as_deref()?);
            format!(
                r#"const center = anchorCenter({near});
                els = interactables();
                if (center) {{
                    const dist = (el) => {{
                        const rect = el.getBoundingClientRect();
                        const dx = rect.x + rect.width / 2 - center[0];
                        const dy = rect.y + rect.height / 2 - center[1];
                        return Math.hypot(dx, dy);
                    }};
                    els = els.slice().sort((a, b) => dist(a) - dist(b));
                }}"#
            )
        }
        Strategy::OrdinalIndex => {
            selector.index?;
            "els = interactables();".to_string()
        }
        // Stable ids resolve through the reconstruction script instead.
        Strategy::StableId => return None,
    };

    let near_text = quote(selector.near_text.as_deref().unwrap_or(""));
    let ordinal = selector
        .index
        .map(|i| i.to_string())
        .unwrap_or_else(|| "null".to_string());

    Some(format!(
        r#"(() => {{
{HELPERS}
    let els = [];
    {collect}
    const inter = interactables();
    const ordinalOf = (el) => {{
        const at = inter.indexOf(el);
        return at;
    }};
    els = els.slice(0, {CANDIDATE_LIMIT});
    const wantedOrdinal = {ordinal};
    if (wantedOrdinal !== null && inter[wantedOrdinal] && !els.includes(inter[wantedOrdinal])) {{
        els.push(inter[wantedOrdinal]);
    }}
    return {{
        candidates: els.map((el) => metricOf(el, ordinalOf(el))),
        anchor: anchorCenter({near_text}),
    }};
}})()"#
    ))
}

/// Script that re-finds a previously resolved element by its CSS path.
pub fn reconstruct_script(dom_path: &str) -> String {
    let quoted = quote(dom_path);
    format!(
        r#"(() => {{
{HELPERS}
    let el = null;
    try {{ el = document.querySelector({quoted}); }} catch (err) {{ el = null; }}
    if (!el) return null;
    const inter = interactables();
    return {{ candidates: [metricOf(el, inter.indexOf(el))], anchor: null }};
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_without_their_field_build_nothing() {
        let selector = Selector::css("#q");
        assert!(probe_script(Strategy::Css, &selector).is_some());
        assert!(probe_script(Strategy::Text, &selector).is_none());
        assert!(probe_script(Strategy::Xpath, &selector).is_none());
        assert!(probe_script(Strategy::StableId, &selector).is_none());
    }

    #[test]
    fn css_probe_embeds_quoted_selector() {
        let selector = Selector::css("a[href=\"x\"]");
        let script = probe_script(Strategy::Css, &selector).unwrap();
        assert!(script.contains("querySelectorAll(\"a[href=\\\"x\\\"]\")"));
    }

    #[test]
    fn ordinal_probe_requests_exact_candidate() {
        let selector = Selector::ordinal(42);
        let script = probe_script(Strategy::OrdinalIndex, &selector).unwrap();
        assert!(script.contains("wantedOrdinal = 42"));
    }
}
