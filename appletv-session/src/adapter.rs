use appletv_api::ChannelKind;

/// Which channels a device kind speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAdapter {
    ControlOnly,
    RemoteOnly,
    Both,
}

impl ChannelAdapter {
    /// Channel kinds in connect order
    pub fn channel_kinds(&self) -> &'static [ChannelKind] {
        match self {
            ChannelAdapter::ControlOnly => &[ChannelKind::RealtimeControl],
            ChannelAdapter::RemoteOnly => &[ChannelKind::RemoteInput],
            ChannelAdapter::Both => &[ChannelKind::RealtimeControl, ChannelKind::RemoteInput],
        }
    }

    pub fn has(&self, kind: ChannelKind) -> bool {
        self.channel_kinds().contains(&kind)
    }
}
