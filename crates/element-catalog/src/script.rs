//! The one-shot in-page collection script.
//!
//! Walks the DOM once in document order and emits raw catalog entries as
//! JSON. Elements hidden by computed style are excluded entirely;
//! off-viewport interactables stay in with `visible: false`.

/// Robust selectors kept per entry, most stable first.
pub const ROBUST_SELECTOR_LIMIT: usize = 5;

pub fn collection_script() -> String {
    format!(
        r#"(() => {{
    const INTERACTIVE_TAGS = ["a", "button", "select", "textarea", "summary", "option"];
    const INTERACTIVE_ROLES = ["button", "link", "textbox", "checkbox", "radio",
        "menuitem", "tab", "switch", "combobox", "slider", "spinbutton", "searchbox"];
    const LANDMARKS = ["nav", "main", "header", "footer", "aside"];

    const styleHidden = (el) => {{
        const style = window.getComputedStyle(el);
        return style.display === "none" || style.visibility === "hidden";
    }};
    const isInteractive = (el) => {{
        if (styleHidden(el)) return false;
        const tag = el.tagName.toLowerCase();
        if (INTERACTIVE_TAGS.includes(tag)) return true;
        if (tag === "input") return (el.getAttribute("type") || "").toLowerCase() !== "hidden";
        if (INTERACTIVE_ROLES.includes(el.getAttribute("role") || "")) return true;
        if (el.hasAttribute("onclick")) return true;
        const tabindex = el.getAttribute("tabindex");
        if (tabindex !== null && parseInt(tabindex, 10) >= 0) return true;
        return el.getAttribute("contenteditable") === "true";
    }};
    const cssPath = (el) => {{
        const parts = [];
        let node = el;
        while (node && node.nodeType === Node.ELEMENT_NODE && node.tagName !== "HTML") {{
            const tag = node.tagName.toLowerCase();
            let nth = 1;
            let sibling = node;
            while ((sibling = sibling.previousElementSibling)) {{
                if (sibling.tagName === node.tagName) nth += 1;
            }}
            parts.unshift(tag + ":nth-of-type(" + nth + ")");
            node = node.parentElement;
        }}
        return parts.join(" > ");
    }};
    const roleOf = (el) => {{
        const explicit = el.getAttribute("role");
        if (explicit) return explicit;
        const tag = el.tagName.toLowerCase();
        if (tag === "a" && el.hasAttribute("href")) return "link";
        if (tag === "button" || tag === "summary") return "button";
        if (tag === "select") return "combobox";
        if (tag === "textarea") return "textbox";
        if (tag === "input") {{
            const type = (el.getAttribute("type") || "text").toLowerCase();
            if (type === "checkbox") return "checkbox";
            if (type === "radio") return "radio";
            if (type === "range") return "slider";
            if (type === "search") return "searchbox";
            if (type === "button" || type === "submit" || type === "reset") return "button";
            return "textbox";
        }}
        return "";
    }};
    const primaryLabel = (el) => {{
        const text = ((el.innerText || "") + "").trim();
        if (text) return text.slice(0, 120);
        for (const attr of ["aria-label", "placeholder", "value", "alt"]) {{
            const value = el.getAttribute(attr);
            if (value && value.trim()) return value.trim().slice(0, 120);
        }}
        return el.tagName.toLowerCase();
    }};
    const secondaryLabel = (el) => {{
        if (el.id) {{
            const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
            if (label) return ((label.innerText || "") + "").trim().slice(0, 120);
        }}
        const wrapping = el.closest("label");
        if (wrapping) return ((wrapping.innerText || "") + "").trim().slice(0, 120);
        return "";
    }};
    const sectionHint = (el) => {{
        let node = el.parentElement;
        while (node) {{
            const tag = node.tagName.toLowerCase();
            if (LANDMARKS.includes(tag)) return tag;
            if (tag === "form") return node.id ? "form#" + node.id : "form";
            node = node.parentElement;
        }}
        return "";
    }};
    const stateHint = (el) => {{
        const states = [];
        if (el.disabled) states.push("disabled");
        if (el.checked) states.push("checked");
        if (el.selected) states.push("selected");
        if (el.getAttribute("aria-expanded") === "true") states.push("expanded");
        if (el.required) states.push("required");
        return states.join(" ");
    }};
    const nearestTexts = (el) => {{
        const texts = [];
        const grab = (node) => {{
            if (!node) return;
            const text = ((node.innerText || node.textContent || "") + "").trim();
            if (text && texts.length < 3) texts.push(text.slice(0, 60));
        }};
        grab(el.previousElementSibling);
        grab(el.nextElementSibling);
        grab(el.parentElement);
        return texts;
    }};
    const xPath = (el) => {{
        const parts = [];
        let node = el;
        while (node && node.nodeType === Node.ELEMENT_NODE && node.tagName !== "HTML") {{
            const tag = node.tagName.toLowerCase();
            let nth = 1;
            let sibling = node;
            while ((sibling = sibling.previousElementSibling)) {{
                if (sibling.tagName === node.tagName) nth += 1;
            }}
            parts.unshift(tag + "[" + nth + "]");
            node = node.parentElement;
        }}
        return "/html/" + parts.join("/");
    }};
    const robustSelectors = (el, path) => {{
        const out = [];
        if (el.id) out.push("css=#" + CSS.escape(el.id));
        const role = roleOf(el);
        if (role) out.push("role=" + role);
        const testid = el.getAttribute("data-testid");
        if (testid) out.push('css=[data-testid="' + testid + '"]');
        out.push("css=" + path);
        out.push("xpath=" + xPath(el));
        const text = ((el.innerText || "") + "").trim();
        if (text) out.push("text=" + text.slice(0, 40));
        return out.slice(0, {ROBUST_SELECTOR_LIMIT});
    }};

    const entries = [];
    for (const el of document.querySelectorAll("*")) {{
        if (!isInteractive(el)) continue;
        const rect = el.getBoundingClientRect();
        const path = cssPath(el);
        const inViewport = rect.bottom > 0 && rect.right > 0 &&
            rect.top < window.innerHeight && rect.left < window.innerWidth;
        const tag = el.tagName.toLowerCase();
        let href = "";
        if (tag === "a") href = (el.getAttribute("href") || "").slice(0, 60);
        entries.push({{
            index: 0,
            tag: tag,
            role: roleOf(el),
            primary_label: primaryLabel(el),
            secondary_label: secondaryLabel(el),
            section_hint: sectionHint(el),
            state_hint: stateHint(el),
            href_short: href,
            robust_selectors: robustSelectors(el, path),
            nearest_texts: nearestTexts(el),
            dom_path: path,
            dom_path_hash: "",
            bbox: [rect.x, rect.y, rect.width, rect.height],
            visible: !styleHidden(el),
            in_viewport: inViewport,
            disabled: el.disabled === true,
        }});
    }}
    return {{ url: location.href, title: document.title, entries: entries }};
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_carries_the_interactive_sets() {
        let script = collection_script();
        assert!(script.contains("\"summary\""));
        assert!(script.contains("spinbutton"));
        assert!(script.contains("contenteditable"));
        assert!(script.contains("location.href"));
    }

    /// `visible` is computed style only; viewport position is reported
    /// separately so off-screen interactables stay visible in the catalog.
    #[test]
    fn script_keeps_visibility_and_viewport_separate() {
        let script = collection_script();
        assert!(script.contains("visible: !styleHidden(el)"));
        assert!(script.contains("in_viewport: inViewport"));
        assert!(!script.contains("visible: rect"));
    }
}
