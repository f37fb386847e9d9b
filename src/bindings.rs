//! Typed view handles, resolved once when the controller is built.

use crate::dom::{Document, NodeId};
use crate::error::{ChatError, Result};

/// Element ids the chat page must provide.
pub mod ids {
    pub const CHAT_LOG: &str = "caixa_chat";
    pub const MESSAGE_FORM: &str = "formulario_mensagem";
    pub const MESSAGE_INPUT: &str = "input_mensagem";
    pub const FILE_INPUT: &str = "input_arquivo";
    pub const ATTACH_MENU: &str = "menu_anexo";
    pub const OPEN_MENU_BUTTON: &str = "botao_abrir_menu";
    pub const ATTACH_IMAGE_BUTTON: &str = "anexar_imagem_btn";
    pub const ATTACH_PDF_BUTTON: &str = "anexar_pdf_btn";
    pub const REMOVE_ATTACHMENT_BUTTON: &str = "remover_anexo_btn";
    pub const PREVIEW: &str = "preview_anexo";
    pub const PREVIEW_IMAGE: &str = "preview_imagem";
    pub const PREVIEW_DOCUMENT_NAME: &str = "preview_pdf_nome";
    pub const THEME_BUTTON: &str = "botao_tema";
    pub const SUN_ICON: &str = "icone_sol";
    pub const MOON_ICON: &str = "icone_lua";
}

/// Class names shared by the renderers.
pub mod classes {
    pub const HIDDEN: &str = "hidden";
    pub const MESSAGE: &str = "mensagem";
    pub const USER: &str = "mensagem_usuario";
    pub const BOT: &str = "mensagem_bot";
    pub const THINKING: &str = "pensando";
    pub const CURSOR: &str = "cursor-piscando";
    pub const DOCUMENT_LINK: &str = "link-pdf";
    pub const DARK_MODE: &str = "dark-mode";
}

/// Every handle the controller touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewBindings {
    pub body: NodeId,
    pub chat_log: NodeId,
    pub message_form: NodeId,
    pub message_input: NodeId,
    pub file_input: NodeId,
    pub attach_menu: NodeId,
    pub open_menu_button: NodeId,
    pub attach_image_button: NodeId,
    pub attach_pdf_button: NodeId,
    pub remove_attachment_button: NodeId,
    pub preview: NodeId,
    pub preview_image: NodeId,
    pub preview_document_name: NodeId,
    pub theme_button: NodeId,
    pub sun_icon: NodeId,
    pub moon_icon: NodeId,
}

impl ViewBindings {
    /// Resolve all handles, failing on the first missing id.
    pub fn bind(doc: &Document) -> Result<Self> {
        let get = |id: &str| {
            doc.get_element_by_id(id)
                .ok_or_else(|| ChatError::MissingElement { id: id.to_string() })
        };
        Ok(ViewBindings {
            body: doc.body(),
            chat_log: get(ids::CHAT_LOG)?,
            message_form: get(ids::MESSAGE_FORM)?,
            message_input: get(ids::MESSAGE_INPUT)?,
            file_input: get(ids::FILE_INPUT)?,
            attach_menu: get(ids::ATTACH_MENU)?,
            open_menu_button: get(ids::OPEN_MENU_BUTTON)?,
            attach_image_button: get(ids::ATTACH_IMAGE_BUTTON)?,
            attach_pdf_button: get(ids::ATTACH_PDF_BUTTON)?,
            remove_attachment_button: get(ids::REMOVE_ATTACHMENT_BUTTON)?,
            preview: get(ids::PREVIEW)?,
            preview_image: get(ids::PREVIEW_IMAGE)?,
            preview_document_name: get(ids::PREVIEW_DOCUMENT_NAME)?,
            theme_button: get(ids::THEME_BUTTON)?,
            sun_icon: get(ids::SUN_ICON)?,
            moon_icon: get(ids::MOON_ICON)?,
        })
    }
}

/// Build the stock chat page layout.
pub fn chat_page() -> Document {
    let mut doc = Document::new();
    let body = doc.body();

    let header = doc.create_element("header");
    doc.append_child(body, header);
    let theme_button = element(&mut doc, header, "button", ids::THEME_BUTTON);
    element(&mut doc, theme_button, "svg", ids::SUN_ICON);
    let moon = element(&mut doc, theme_button, "svg", ids::MOON_ICON);
    doc.add_class(moon, classes::HIDDEN);

    element(&mut doc, body, "div", ids::CHAT_LOG);

    let preview = element(&mut doc, body, "div", ids::PREVIEW);
    doc.add_class(preview, classes::HIDDEN);
    let preview_image = element(&mut doc, preview, "img", ids::PREVIEW_IMAGE);
    doc.add_class(preview_image, classes::HIDDEN);
    let preview_name = element(&mut doc, preview, "span", ids::PREVIEW_DOCUMENT_NAME);
    doc.add_class(preview_name, classes::HIDDEN);
    element(&mut doc, preview, "button", ids::REMOVE_ATTACHMENT_BUTTON);

    let form = element(&mut doc, body, "form", ids::MESSAGE_FORM);
    element(&mut doc, form, "button", ids::OPEN_MENU_BUTTON);
    let menu = element(&mut doc, form, "div", ids::ATTACH_MENU);
    doc.add_class(menu, classes::HIDDEN);
    element(&mut doc, menu, "button", ids::ATTACH_IMAGE_BUTTON);
    element(&mut doc, menu, "button", ids::ATTACH_PDF_BUTTON);
    let file_input = element(&mut doc, form, "input", ids::FILE_INPUT);
    doc.set_attribute(file_input, "type", "file");
    doc.add_class(file_input, classes::HIDDEN);
    let text_input = element(&mut doc, form, "input", ids::MESSAGE_INPUT);
    doc.set_attribute(text_input, "type", "text");

    doc
}

fn element(doc: &mut Document, parent: NodeId, tag: &str, id: &str) -> NodeId {
    let node = doc.create_element(tag);
    doc.set_id(node, id);
    doc.append_child(parent, node);
    node
}
