use crate::{EntityView, ObjectHost, SchemaResolver, WireSender};

/// The collaborators a bridge operation works against, borrowed for the
/// duration of one call
pub struct BridgeContext<'a, P> {
    pub view: &'a dyn EntityView<P>,
    pub schema: &'a dyn SchemaResolver,
    pub host: &'a mut dyn ObjectHost,
    pub wire: &'a mut dyn WireSender<P>,
}

impl<'a, P> BridgeContext<'a, P> {
    pub fn new(
        view: &'a dyn EntityView<P>,
        schema: &'a dyn SchemaResolver,
        host: &'a mut dyn ObjectHost,
        wire: &'a mut dyn WireSender<P>,
    ) -> Self {
        Self {
            view,
            schema,
            host,
            wire,
        }
    }
}
