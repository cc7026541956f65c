/// Delivery of the custom-resource response document.
pub trait CallbackSender {
    fn send(&self, response_url: &str, body: &str) -> Result<(), String>;
}
