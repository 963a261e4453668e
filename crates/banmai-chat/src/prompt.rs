//! Prompt composition.
//!
//! Builds the system instruction (persona rules + knowledge context +
//! optional direct-match grounding) and the annotated user message sent to
//! the completion service. The fixed fallback texts live here too.

use banmai_kb::KnowledgeEntry;

/// Reply used when the completion call fails with no direct match to fall
/// back on.
pub const APOLOGY: &str =
    "Xin lỗi anh/chị, em đang gặp sự cố kỹ thuật. Anh/chị vui lòng thử lại sau ạ! 🙏";

/// Reply used when the completion service has no credentials.
pub const NOT_CONFIGURED_REPLY: &str =
    "Bot chưa được cấu hình API key nên em chưa trả lời tự động được. Anh/chị vui lòng liên hệ quản trị viên ạ!";

/// Persona and tone rules for the sales assistant.
const PERSONA: &str = "Bạn là nhân viên tư vấn bán hàng chuyên nghiệp, thân thiện.
Nhiệm vụ: Trả lời câu hỏi của khách hàng dựa trên thông tin sản phẩm/dịch vụ được cung cấp.

QUY TẮC QUAN TRỌNG:
1. Trả lời ngắn gọn, thân thiện, dùng emoji phù hợp
2. Xưng hô: \"em\" (nhân viên) - \"anh/chị\" hoặc \"mình\" (khách hàng)
3. Nếu không có thông tin, nói \"Em sẽ kiểm tra và phản hồi anh/chị sau ạ\"
4. Nếu khách hỏi giá, luôn trả lời cụ thể nếu có trong dữ liệu
5. Cuối câu thường thêm \"ạ\" hoặc \"nha\" để thân thiện
6. KHÔNG bịa thông tin không có trong dữ liệu";

/// Dump the knowledge base grouped by category, in first-seen category
/// order, capped per category to bound the prompt size.
pub fn build_context(entries: &[KnowledgeEntry], category_cap: usize) -> String {
    let mut categories: Vec<(&str, Vec<&KnowledgeEntry>)> = Vec::new();
    for entry in entries {
        match categories.iter_mut().find(|(cat, _)| *cat == entry.category) {
            Some((_, group)) => group.push(entry),
            None => categories.push((entry.category.as_str(), vec![entry])),
        }
    }

    let mut parts = Vec::new();
    for (category, group) in &categories {
        parts.push(format!("\n=== {} ===", category.to_uppercase()));
        for entry in group.iter().take(category_cap) {
            parts.push(format!("Hỏi: {}\nTrả lời: {}", entry.question, entry.answer));
        }
    }
    parts.join("\n")
}

/// Build the full system instruction for one respond call.
pub fn build_system_instruction(
    entries: &[KnowledgeEntry],
    direct_match: Option<&KnowledgeEntry>,
    category_cap: usize,
) -> String {
    let mut instruction = format!(
        "{PERSONA}\n\nTHÔNG TIN SẢN PHẨM/DỊCH VỤ:\n{}\n",
        build_context(entries, category_cap)
    );

    if let Some(entry) = direct_match {
        instruction.push_str(&format!(
            "\nTÌM THẤY CÂU TRẢ LỜI TRỰC TIẾP:\nCâu hỏi mẫu: {}\nCâu trả lời mẫu: {}\n\
             (Hãy dựa vào câu trả lời mẫu này để trả lời, có thể điều chỉnh cho tự nhiên hơn)\n",
            entry.question, entry.answer
        ));
    }

    instruction
}

/// The current message as sent to the model, annotated with its expanded
/// form when expansion changed it.
pub fn build_user_content(message: &str, expanded: &str) -> String {
    let mut content = format!("Khách hàng: {message}");
    if expanded != message.to_lowercase() {
        content.push_str(&format!("\n(Hiểu là: {expanded})"));
    }
    content
}
