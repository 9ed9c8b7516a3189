//! Static code tables used by the special-processing checks

/// Invasive plant map codes and their common names, sorted by code
pub static INVASIVE_PLANT_CODES: &[(&str, &str)] = &[
    ("AA", "Tree of heaven"),
    ("AB", "American beachgrass"),
    ("AD", "Giant reed / giant cane"),
    ("AH", "Saltlover / halogeton"),
    ("AM", "Camel thorn"),
    ("AO", "Common bugloss"),
    ("AP", "Garlic mustard"),
    ("AQ", "Water soldier"),
    ("AR", "African rue / harmal"),
    ("AS", "Annual sow thistle"),
    ("BA", "Barnyard grass"),
    ("BB", "Bachelors button"),
    ("BC", "Bladder campion"),
    ("BD", "Butterfly bush"),
    ("BF", "False brome"),
    ("BH", "Black henbane"),
    ("BI", "Hedge false bindweed"),
    ("BK", "Brown knapweed"),
    ("BL", "Black knapweed"),
    ("BO", "Bohemian knotweed"),
    ("BP", "Bigleaf / Large periwinkle"),
    ("BR", "Red bartsia"),
    ("BS", "Spanish bluebells"),
    ("BT", "Bull thistle"),
    ("BU", "Burdock species"),
    ("BW", "Blueweed"),
    ("BY", "Babys breath"),
    ("CA", "Caraway"),
    ("CB", "Bur chervil"),
    ("CC", "Common crupina"),
    ("CD", "Curled dock"),
    ("CE", "Clary sage"),
    ("CF", "Coltsfoot"),
    ("CG", "Carpet burweed"),
    ("CH", "Chilean tarweed"),
    ("CL", "Cutleaf blackberry"),
    ("CN", "Short-fringed knapweed"),
    ("CO", "Common comfrey"),
    ("CP", "Common periwinkle"),
    ("CR", "Creeping buttercup"),
    ("CS", "Cypress spurge"),
    ("CT", "Canada thistle"),
    ("CU", "Cudweed"),
    ("CV", "Squarrose knapweed"),
    ("CX", "Common hawkweed"),
    ("CY", "Chicory"),
    ("DB", "Cheatgrass / downy brome"),
    ("DC", "Dense-flowered cordgrass"),
    ("DE", "Dwarf eelgrass"),
    ("DI", "Didymo"),
    ("DK", "Diffuse knapweed"),
    ("DO", "Dodder"),
    ("DR", "Dames rocket"),
    ("DT", "Dalmatian toadflax"),
    ("DW", "Dyers woad"),
    ("EB", "European beachgrass"),
    ("EC", "English cordgrass"),
    ("ED", "Brazilian waterweed"),
    ("EH", "European hawkweed"),
    ("EI", "English ivy"),
    ("EL", "European lake sedge"),
    ("ES", "Eggleaf spurge"),
    ("EW", "Eurasian watermilfoil"),
    ("EY", "Eyebright"),
    ("FB", "Field bindweed"),
    ("FC", "Common frogbit"),
    ("FL", "Fragrant water lily"),
    ("FM", "Feathered mosquito-fern"),
    ("FP", "Flat pea / flat peavine"),
    ("FR", "Flowering rush"),
    ("FS", "Field scabious"),
    ("FT", "Slender meadow foxtail"),
    ("FW", "Fanwort"),
    ("GC", "Greater celandine"),
    ("GF", "Green foxtail / green bristlegrass"),
    ("GH", "Giant hogweed"),
    ("GJ", "Johnsongrass"),
    ("GK", "Giant knotweed"),
    ("GL", "Garden yellow loosestrife"),
    ("GM", "French broom"),
    ("GN", "Greater knapweed"),
    ("GO", "Gorse"),
    ("GR", "Herb robert"),
    ("GS", "Groundsel"),
    ("GW", "Goutweed / bishops weed"),
    ("HA", "Hoary alyssum"),
    ("HB", "Annual hawksbeard"),
    ("HC", "Hoary cress"),
    ("HD", "Hedgehog dogtail"),
    ("HG", "Smooth cats ear"),
    ("HI", "Himalayan blackberry"),
    ("HO", "English holly"),
    ("HR", "Hairy cats-ear"),
    ("HS", "Hawkweed species"),
    ("HT", "Hounds-tongue"),
    ("HY", "Hydrilla"),
    ("IM", "Policemans helmet / him. balsam"),
    ("IS", "Iberian starthistle"),
    ("IT", "Italian plumeless thistle"),
    ("JG", "Jointed goatgrass"),
    ("JK", "Japanese knotweed"),
    ("JW", "Japanese wireweed"),
    ("KB", "Bighead knapweed"),
    ("KH", "King devil hawkweed"),
    ("KO", "Kochia"),
    ("KS", "Knapweed species"),
    ("KU", "Kudzu"),
    ("LC", "Cherry laurel"),
    ("LL", "Large yellow / spotted loosestrife"),
    ("LM", "Variable leaf milfoil"),
    ("LO", "Longspine sandbur"),
    ("LP", "Portugese laurel"),
    ("LS", "Leafy spurge"),
    ("LT", "Ladys-thumb"),
    ("LW", "Water lettuce"),
    ("MA", "Giant chickweed"),
    ("MB", "Meadow buttercup"),
    ("MC", "Meadow clary"),
    ("ME", "Mouse ear hawkweed"),
    ("MG", "Meadow goats-beard"),
    ("MH", "Meadow hawkweed"),
    ("MI", "Milk thistle"),
    ("MK", "Meadow knapweed"),
    ("MO", "Mountain bluet"),
    ("MQ", "European water clover"),
    ("MS", "Mediterranean sage"),
    ("MT", "Marsh plume thistle/Marsh thistle"),
    ("MU", "Mullein"),
    ("MV", "Spring millet grass"),
    ("MX", "Maltese star thistle"),
    ("NA", "North africa grass"),
    ("NC", "Night-flowering catchfly"),
    ("NI", "Nightshade"),
    ("NO", "Watercress"),
    ("NS", "Silverleaf nightshade"),
    ("NT", "Nodding thistle"),
    ("OD", "Oxeye daisy"),
    ("OH", "Orange hawkweed"),
    ("OM", "Old mans beard / travellers joy"),
    ("OW", "Major oxygen weed"),
    ("PA", "Polar hawkweed"),
    ("PC", "Prickly comfrey"),
    ("PD", "Purple deadnettle"),
    ("PF", "Parrot feather"),
    ("PH", "Poison hemlock"),
    ("PL", "Purple loosestrife"),
    ("PN", "Purple nutsedge"),
    ("PO", "Himalayan knotweed"),
    ("PP", "Perennial pepperweed"),
    ("PR", "Portuguese broom"),
    ("PS", "Perennial sow thistle"),
    ("PT", "Plumeless thistle"),
    ("PU", "Purple starthistle"),
    ("PV", "Puncturevine"),
    ("PW", "Wild parsnip"),
    ("QA", "Queen annes lace / wild carrot"),
    ("QH", "Queen devil hawkweed"),
    ("RA", "Bristly locust / rose acacia"),
    ("RB", "Black locust"),
    ("RC", "Common reed"),
    ("RF", "Lesser celandine / fig buttercup"),
    ("RG", "Goats rue / french lilac"),
    ("RI", "Bog bulrush / ricefield bulrush"),
    ("RK", "Russian knapweed"),
    ("RO", "Russian olive"),
    ("RP", "Redroot amaranth / rough pigweed"),
    ("RS", "Rush skeletonweed"),
    ("RT", "Russian thistle"),
    ("SA", "Saltwater cord grass"),
    ("SB", "Scotch broom"),
    ("SC", "Sulphur cinquefoil"),
    ("SE", "Siberian elm"),
    ("SF", "Sweet fennel"),
    ("SG", "Shiny geranium"),
    ("SH", "Scentless chamomile"),
    ("SI", "Spanish broom"),
    ("SJ", "St. Johns wort/Goatweed"),
    ("SK", "Spotted knapweed"),
    ("SL", "Daphne / spurge laurel"),
    ("SM", "Smooth hawkweed"),
    ("SN", "Salt-meadow cord grass"),
    ("SO", "Sowthistle species"),
    ("SP", "Shepherds-purse"),
    ("SS", "Sheep sorrel"),
    ("ST", "Scotch thistle"),
    ("SV", "Giant salvinia"),
    ("SW", "Giant mannagrass / reed sweetgrass"),
    ("SX", "Spotted hawkweed"),
    ("SY", "Syrian bean-caper"),
    ("TA", "Saltcedar / tamarisk"),
    ("TB", "Tartary buckwheat"),
    ("TC", "Common tansy"),
    ("TH", "Tall hawkweed"),
    ("TM", "Medusahead"),
    ("TN", "Water chestnut"),
    ("TP", "Spurge flax"),
    ("TR", "Tansy ragwort"),
    ("TS", "Teasel"),
    ("TX", "Texas blueweed"),
    ("UP", "Curly leaf pondweed"),
    ("VL", "Velvet leaf"),
    ("WA", "Wall hawkweed"),
    ("WB", "Wild buckwheat"),
    ("WC", "White cockle"),
    ("WE", "European waterlily"),
    ("WF", "Wild four oclock"),
    ("WG", "Western goats-beard"),
    ("WH", "Water hyacinth"),
    ("WI", "Wild chervil"),
    ("WL", "Wand loosestrife"),
    ("WM", "Wild mustard"),
    ("WO", "Wild oats"),
    ("WP", "Whiplash hawkweed"),
    ("WS", "Wood sage"),
    ("WT", "Winged / slender-flowered thistle"),
    ("WW", "Wormwood"),
    ("YA", "Yellow archangel"),
    ("YC", "Amphibious yellow cress"),
    ("YD", "Yellow devil hawkweed"),
    ("YF", "Yellow floating heart"),
    ("YH", "Yellow hawkweed"),
    ("YI", "Yellow iris <5m2"),
    ("YN", "Yellow nutsedge"),
    ("YS", "Yellow starthistle"),
    ("YT", "Yellow/common toadflax"),
];

/// Common name of an invasive plant map code
pub fn invasive_plant_name(code: &str) -> Option<&'static str> {
    INVASIVE_PLANT_CODES
        .binary_search_by(|(c, _)| (*c).cmp(code))
        .ok()
        .map(|idx| INVASIVE_PLANT_CODES[idx].1)
}

/// Grizzly bear suitability classes; lower rank is better habitat
pub static GRIZZLY_SUITABILITY_RANKS: &[(&str, u8, &str)] = &[
    ("High", 1, "H"),
    ("High-Mod", 2, "H-M"),
    ("Moderate", 3, "M"),
    ("Low", 4, "L"),
    ("Very Low", 5, "VL"),
    ("Nil", 6, "Nil"),
    ("Unrated", 7, "N/R"),
];

pub fn suitability_rank(class: &str) -> Option<u8> {
    GRIZZLY_SUITABILITY_RANKS
        .iter()
        .find(|(name, _, _)| *name == class)
        .map(|(_, rank, _)| *rank)
}

pub fn suitability_code(rank: u8) -> Option<&'static str> {
    GRIZZLY_SUITABILITY_RANKS
        .iter()
        .find(|(_, r, _)| *r == rank)
        .map(|(_, _, code)| *code)
}
