use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

/// NetFlow v9 field types, from the Cisco registry (RFC 3954 section 8).
/// Values 65-69, 97 and 105-127 are vendor proprietary and unassigned ranges
/// are left out; unknown numbers still decode by width, this registry only
/// supplies names and display hints.
#[derive(FromPrimitive, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone)]
#[repr(u16)]
pub enum FieldType {
    InBytes = 1,
    InPkts = 2,
    Flows = 3,
    Protocol = 4,
    SrcTos = 5,
    TcpFlags = 6,
    L4SrcPort = 7,
    Ipv4SrcAddr = 8,
    SrcMask = 9,
    InputSnmp = 10,
    L4DstPort = 11,
    Ipv4DstAddr = 12,
    DstMask = 13,
    OutputSnmp = 14,
    Ipv4NextHop = 15,
    SrcAs = 16,
    DstAs = 17,
    BgpIpv4NextHop = 18,
    MulDstPkts = 19,
    MulDstBytes = 20,
    LastSwitched = 21,
    FirstSwitched = 22,
    OutBytes = 23,
    OutPkts = 24,
    MinPktLngth = 25,
    MaxPktLngth = 26,
    Ipv6SrcAddr = 27,
    Ipv6DstAddr = 28,
    Ipv6SrcMask = 29,
    Ipv6DstMask = 30,
    Ipv6FlowLabel = 31,
    IcmpType = 32,
    MulIgmpType = 33,
    SamplingInterval = 34,
    SamplingAlgorithm = 35,
    FlowActiveTimeout = 36,
    FlowInactiveTimeout = 37,
    EngineType = 38,
    EngineId = 39,
    TotalBytesExp = 40,
    TotalPktsExp = 41,
    TotalFlowsExp = 42,
    Ipv4SrcPrefix = 44,
    Ipv4DstPrefix = 45,
    MplsTopLabelType = 46,
    MplsTopLabelIpAddr = 47,
    FlowSamplerId = 48,
    FlowSamplerMode = 49,
    FlowSamplerRandomInterval = 50,
    MinTtl = 52,
    MaxTtl = 53,
    Ipv4Ident = 54,
    DstTos = 55,
    InSrcMac = 56,
    OutDstMac = 57,
    SrcVlan = 58,
    DstVlan = 59,
    IpProtocolVersion = 60,
    Direction = 61,
    Ipv6NextHop = 62,
    BgpIpv6NextHop = 63,
    Ipv6OptionHeaders = 64,
    MplsLabel1 = 70,
    MplsLabel2 = 71,
    MplsLabel3 = 72,
    MplsLabel4 = 73,
    MplsLabel5 = 74,
    MplsLabel6 = 75,
    MplsLabel7 = 76,
    MplsLabel8 = 77,
    MplsLabel9 = 78,
    MplsLabel10 = 79,
    InDstMac = 80,
    OutSrcMac = 81,
    IfName = 82,
    IfDesc = 83,
    SamplerName = 84,
    InPermanentBytes = 85,
    InPermanentPkts = 86,
    FragmentOffset = 88,
    ForwardingStatus = 89,
    MplsPalRd = 90,
    MplsPrefixLen = 91,
    SrcTrafficIndex = 92,
    DstTrafficIndex = 93,
    ApplicationDescription = 94,
    ApplicationTag = 95,
    ApplicationName = 96,
    PostipDiffServCodePoint = 98,
    ReplicationFactor = 99,
    Layer2PacketSectionOffset = 102,
    Layer2PacketSectionSize = 103,
    Layer2PacketSectionData = 104,
}

/// Advisory decode hint for a field type. Values are always carved by width;
/// the kind only drives how a value is rendered.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum FieldKind {
    Unsigned,
    Ipv4Addr,
    Ipv6Addr,
    MacAddr,
    Text,
    Bytes,
}

impl FieldType {
    pub fn from_number(num: u16) -> Option<Self> {
        Self::from_u16(num)
    }

    pub fn kind(self) -> FieldKind {
        use FieldType::*;

        match self {
            Ipv4SrcAddr | Ipv4DstAddr | Ipv4NextHop | BgpIpv4NextHop | Ipv4SrcPrefix
            | Ipv4DstPrefix | MplsTopLabelIpAddr => FieldKind::Ipv4Addr,
            Ipv6SrcAddr | Ipv6DstAddr | Ipv6NextHop | BgpIpv6NextHop => FieldKind::Ipv6Addr,
            InSrcMac | OutDstMac | InDstMac | OutSrcMac => FieldKind::MacAddr,
            IfName | IfDesc | SamplerName | ApplicationDescription | ApplicationName => {
                FieldKind::Text
            }
            MplsPalRd | Layer2PacketSectionData => FieldKind::Bytes,
            _ => FieldKind::Unsigned,
        }
    }
}

/// Scope types announced in option templates. A separate namespace from
/// `FieldType`: scope "System" is 1, and so is IN_BYTES.
#[derive(FromPrimitive, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone)]
#[repr(u16)]
pub enum ScopeType {
    System = 1,
    Interface = 2,
    LineCard = 3,
    Cache = 4,
    Template = 5,
}

impl ScopeType {
    pub fn from_number(num: u16) -> Option<Self> {
        Self::from_u16(num)
    }
}
